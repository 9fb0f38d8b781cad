use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::error::ConfigError;

/// Discovered FFmpeg binary paths
#[derive(Debug, Clone)]
pub struct FfmpegPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// A binary the service shells out to.
#[derive(Debug, Clone, Copy)]
struct Tool {
    name: &'static str,
    env_var: &'static str,
}

const FFMPEG: Tool = Tool {
    name: "ffmpeg",
    env_var: "FFMPEG_PATH",
};

const FFPROBE: Tool = Tool {
    name: "ffprobe",
    env_var: "FFPROBE_PATH",
};

impl FfmpegPaths {
    /// Discover FFmpeg and FFprobe binaries.
    /// Search order:
    /// 1. Environment variables (FFMPEG_PATH, FFPROBE_PATH)
    /// 2. Platform-specific common locations
    /// 3. System PATH
    pub fn discover() -> Result<Self, ConfigError> {
        let ffmpeg = find_tool(FFMPEG).ok_or_else(|| {
            ConfigError::FfmpegNotFound(describe_search_paths(FFMPEG))
        })?;
        let ffprobe = find_tool(FFPROBE).ok_or_else(|| {
            ConfigError::FfprobeNotFound(describe_search_paths(FFPROBE))
        })?;

        info!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "FFmpeg binaries discovered");

        Ok(Self { ffmpeg, ffprobe })
    }
}

fn find_tool(tool: Tool) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(tool.env_var) {
        let path = PathBuf::from(path);
        if validate_binary(&path, tool.name) {
            debug!(tool = tool.name, path = %path.display(), "Found via environment");
            return Some(path);
        }
    }

    if let Some(path) = search_paths(tool.name)
        .into_iter()
        .find(|p| validate_binary(p, tool.name))
    {
        debug!(tool = tool.name, path = %path.display(), "Found in common location");
        return Some(path);
    }

    let path = find_in_path(tool.name)?;
    debug!(tool = tool.name, path = %path.display(), "Found in PATH");
    Some(path)
}

/// Validate that a binary exists and answers `-version` with its own name
fn validate_binary(path: &Path, expected_name: &str) -> bool {
    if !path.exists() {
        return false;
    }

    match Command::new(path).arg("-version").output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .to_lowercase()
            .contains(expected_name),
        _ => false,
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let name = format!("{}.exe", name);

    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&name))
            .find(|path| path.exists())
    })
}

fn describe_search_paths(tool: Tool) -> String {
    let mut searched = vec![format!("${}", tool.env_var)];
    searched.extend(search_paths(tool.name).iter().map(|p| p.display().to_string()));
    searched.push("PATH".to_string());
    searched.join(", ")
}

/// Platform-specific install locations for a binary
fn search_paths(name: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            paths.push(PathBuf::from(format!(
                "{}\\ffmpeg\\bin\\{}.exe",
                local_app_data, name
            )));
        }
        paths.push(PathBuf::from(format!("C:\\ffmpeg\\bin\\{}.exe", name)));
        paths.push(PathBuf::from(format!(
            "C:\\Program Files\\ffmpeg\\bin\\{}.exe",
            name
        )));
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from(format!("/opt/homebrew/bin/{}", name))); // ARM
        paths.push(PathBuf::from(format!("/usr/local/bin/{}", name))); // Intel
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from(format!("/usr/bin/{}", name)));
        paths.push(PathBuf::from(format!("/usr/local/bin/{}", name)));
        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(format!("{}/.local/bin/{}", home, name)));
        }
    }

    paths
}
