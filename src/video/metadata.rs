use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::VideoError;

/// Duration substituted when the probe reports nothing usable
pub const FALLBACK_DURATION_SECS: f64 = 1.0;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoMetadata {
    pub format: FormatInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatInfo {
    pub duration: Option<String>,
}

impl VideoMetadata {
    /// Extract container metadata from a media file using ffprobe
    pub async fn extract(input: &Path, ffprobe_path: &Path) -> Result<Self, VideoError> {
        let output = Command::new(ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VideoError::ProbeFailed(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::ProbeFailed(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(output = %stdout, "ffprobe output");

        Self::from_json(&stdout)
    }

    pub fn from_json(json: &str) -> Result<Self, VideoError> {
        serde_json::from_str(json).map_err(|e| VideoError::ProbeFailed(e.to_string()))
    }

    /// Duration in seconds as reported by ffprobe.
    ///
    /// A missing `format.duration` field is an error; a present but
    /// unparsable value reads as zero.
    pub fn duration_secs(&self) -> Result<f64, VideoError> {
        let raw = self
            .format
            .duration
            .as_deref()
            .ok_or_else(|| VideoError::ProbeFailed("no duration in ffprobe output".to_string()))?;

        Ok(raw.trim().parse().unwrap_or(0.0))
    }
}

/// Probe a media file for its total duration in seconds.
pub async fn probe_duration(input: &Path, ffprobe_path: &Path) -> Result<f64, VideoError> {
    VideoMetadata::extract(input, ffprobe_path).await?.duration_secs()
}

/// Duration used as the progress denominator.
///
/// Non-positive or non-finite values fall back to one second so the
/// pipeline keeps running; percentages are meaningless in that case.
pub fn effective_duration(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        warn!(reported = secs, "Unusable media duration, falling back to 1s");
        FALLBACK_DURATION_SECS
    }
}
