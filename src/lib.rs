//! HLS ingest service
//!
//! Accepts video uploads, converts them to HLS with ffmpeg, reports
//! conversion progress while it runs, and keeps video metadata in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod storage;
pub mod util;
pub mod video;
pub mod web;

pub use config::Config;
pub use error::{AppError, ConfigError, StorageError, VideoError};
