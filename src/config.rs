use std::path::PathBuf;

use crate::error::ConfigError;
use crate::util::FfmpegPaths;

/// Public URL prefix under which HLS output is served
pub const HLS_URL_PREFIX: &str = "/hls";

/// Name of the manifest ffmpeg writes into each job's output directory
pub const MANIFEST_NAME: &str = "index.m3u8";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_host: String,
    pub http_port: u16,
    /// Where uploaded source files are stored
    pub upload_dir: PathBuf,
    /// Root of the per-job HLS output directories
    pub hls_dir: PathBuf,
    pub database_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Config {
    /// Build the config from environment variables, discovering ffmpeg/ffprobe.
    pub fn from_env() -> Result<Self, ConfigError> {
        let paths = FfmpegPaths::discover()?;
        Self::from_env_with_tools(paths)
    }

    /// Build the config from environment variables using known tool paths.
    pub fn from_env_with_tools(paths: FfmpegPaths) -> Result<Self, ConfigError> {
        let http_host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let http_port = match std::env::var("SERVER_PORT") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT"))?,
            _ => 8080,
        };

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let hls_dir = std::env::var("HLS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./hls"));

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./videos.db"));

        Ok(Self {
            http_host,
            http_port,
            upload_dir,
            hls_dir,
            database_path,
            ffmpeg_path: paths.ffmpeg,
            ffprobe_path: paths.ffprobe,
        })
    }

    /// Output directory for a job's manifest and segments
    pub fn job_output_dir(&self, job_id: &str) -> PathBuf {
        self.hls_dir.join(job_id)
    }

    /// Public URL of a job's manifest
    pub fn manifest_url(job_id: &str) -> String {
        format!("{}/{}/{}", HLS_URL_PREFIX, job_id, MANIFEST_NAME)
    }
}
