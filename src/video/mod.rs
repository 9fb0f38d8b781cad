pub mod ffmpeg;
pub mod metadata;
pub mod progress;

pub use ffmpeg::{HlsCommand, TranscodeProcess};
pub use metadata::{effective_duration, probe_duration, VideoMetadata};
pub use progress::{ParseSummary, ProgressParser};
