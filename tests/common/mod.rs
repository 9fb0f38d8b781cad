//! Shared fixtures: a temp workspace and shell scripts standing in for
//! ffprobe and ffmpeg.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hls_ingest::job::ProgressStore;
use hls_ingest::Config;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Writing an executable while another thread forks can make exec fail
/// with ETXTBSY, so tests that write or run fake tools take this lock.
pub static PROCESS_LOCK: Mutex<()> = Mutex::const_new(());

pub struct Fixture {
    pub dir: TempDir,
    pub config: Arc<Config>,
}

impl Fixture {
    pub fn new(ffprobe_script: &str, ffmpeg_script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        let ffprobe_path = write_script(&bin.join("ffprobe"), ffprobe_script);
        let ffmpeg_path = write_script(&bin.join("ffmpeg"), ffmpeg_script);

        let config = Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 0,
            upload_dir: dir.path().join("uploads"),
            hls_dir: dir.path().join("hls"),
            database_path: dir.path().join("videos.db"),
            ffmpeg_path,
            ffprobe_path,
        };

        Self {
            dir,
            config: Arc::new(config),
        }
    }
}

fn write_script(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// ffprobe printing the given `format.duration`
pub fn ffprobe_reporting(duration: &str) -> String {
    format!(
        r#"echo '{{"format": {{"filename": "input.mp4", "duration": "{}"}}}}'"#,
        duration
    )
}

pub fn ffprobe_failing() -> String {
    "echo 'input.mp4: Invalid data found when processing input' >&2\nexit 1".to_string()
}

/// ffmpeg writing `progress` to stderr, then a manifest to its last argument
pub fn ffmpeg_succeeding(progress: &str) -> String {
    format!(
        "for last; do :; done\nprintf '{}' >&2\nprintf '#EXTM3U\\n' > \"$last\"\nexit 0",
        progress
    )
}

/// Like `ffmpeg_succeeding`, but blocks after the progress lines until
/// `release` exists.
pub fn ffmpeg_waiting(progress: &str, release: &Path) -> String {
    format!(
        "for last; do :; done\nprintf '{}' >&2\nwhile [ ! -f '{}' ]; do sleep 0.05; done\nprintf '#EXTM3U\\n' > \"$last\"\nexit 0",
        progress,
        release.display()
    )
}

pub fn ffmpeg_failing(progress: &str) -> String {
    format!(
        "printf '{}' >&2\necho 'Error opening input: Invalid data found when processing input' >&2\nexit 1",
        progress
    )
}

/// Poll until the job's progress equals `expected`
pub async fn wait_for_progress(store: &ProgressStore, id: &str, expected: f64) {
    let poll = async {
        while store.get_progress(id).await != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), poll)
        .await
        .unwrap_or_else(|_| panic!("progress for {} never reached {}", id, expected));
}
