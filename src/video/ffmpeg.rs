use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStderr, Command};
use tracing::debug;

use crate::error::VideoError;

/// Target segment length in seconds
pub const HLS_SEGMENT_SECS: u32 = 10;

/// FFmpeg invocation producing a single-rendition HLS stream.
///
/// Progress is requested as `key=value` lines on stderr (`-progress pipe:2`)
/// with the interactive stats line turned off.
#[derive(Debug, Clone)]
pub struct HlsCommand {
    input: PathBuf,
    output: PathBuf,
    hls_time: u32,
}

impl HlsCommand {
    pub fn new(input: &Path, output: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            hls_time: HLS_SEGMENT_SECS,
        }
    }

    /// Arguments passed to ffmpeg, in order
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        // Overwrite without asking
        args.push("-y".into());

        args.push("-i".into());
        args.push(self.input.clone().into_os_string());

        // Baseline profile for broad player compatibility
        args.extend(
            [
                "-profile:v",
                "baseline",
                "-level",
                "3.0",
                "-start_number",
                "0",
            ]
            .map(OsString::from),
        );

        args.push("-hls_time".into());
        args.push(self.hls_time.to_string().into());
        args.extend(["-hls_list_size", "0", "-f", "hls"].map(OsString::from));

        args.extend(["-progress", "pipe:2", "-nostats"].map(OsString::from));

        args.push(self.output.clone().into_os_string());
        args
    }

    /// Start ffmpeg with its diagnostic stream piped back to us
    pub fn spawn(&self, ffmpeg_path: &Path) -> Result<TranscodeProcess, VideoError> {
        let mut cmd = Command::new(ffmpeg_path);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(command = ?cmd, "Running FFmpeg");

        let mut child = cmd.spawn()?;
        let diagnostics = child.stderr.take();

        Ok(TranscodeProcess { child, diagnostics })
    }
}

/// A running ffmpeg process.
#[derive(Debug)]
pub struct TranscodeProcess {
    child: Child,
    diagnostics: Option<ChildStderr>,
}

impl TranscodeProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Hand out the diagnostic stream. Only the first call returns it.
    pub fn take_diagnostics(&mut self) -> Option<ChildStderr> {
        self.diagnostics.take()
    }

    pub async fn wait(&mut self) -> Result<ExitStatus, VideoError> {
        Ok(self.child.wait().await?)
    }
}

/// Turn a finished process's exit status into a transcode result
pub fn check_exit(status: ExitStatus, diagnostics: String) -> Result<(), VideoError> {
    if status.success() {
        Ok(())
    } else {
        Err(VideoError::TranscodeFailed {
            code: status.code(),
            diagnostics,
        })
    }
}
