use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Video {0} not found")]
    NotFound(i64),

    #[error("Job id already in use: {0}")]
    Conflict(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("FFmpeg not found. Searched: {0}")]
    FfmpegNotFound(String),

    #[error("FFprobe not found. Searched: {0}")]
    FfprobeNotFound(String),
}

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("FFprobe failed: {0}")]
    ProbeFailed(String),

    #[error("FFmpeg failed (exit code {code:?}): {diagnostics}")]
    TranscodeFailed {
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration {0} failed: {1}")]
    Migration(usize, String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}
