pub mod ffmpeg_discovery;

pub use ffmpeg_discovery::FfmpegPaths;
