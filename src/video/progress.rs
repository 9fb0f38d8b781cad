//! Parsing of ffmpeg's `-progress` stream.
//!
//! ffmpeg writes blocks of `key=value` lines, each block ending with
//! `progress=continue` or `progress=end`. Ordinary log output (warnings,
//! errors) is interleaved on the same stream when it is stderr.

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use crate::job::{JobId, ProgressStore};

/// Keep only the last N bytes of non-progress output for error reports
pub const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

/// Longest line kept from the diagnostic stream; the rest of the line is
/// read and discarded
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Minimum advance, in percentage points, between progress log lines
const LOG_STEP_PCT: f64 = 5.0;

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z0-9_]+)=(.*)$").expect("invalid field regex"));

/// One line of the diagnostic stream
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine<'a> {
    /// `out_time_ms`, which despite the name is in microseconds
    OutTime(f64),
    /// `progress=continue|end`
    Event(&'a str),
    /// `frame=` or `speed=`
    Stat(&'a str),
    /// Any other progress field
    Field,
    /// Not part of the progress protocol
    Other,
}

/// Classify a single line. Unparsable elapsed times read as zero.
pub fn classify(line: &str) -> ProgressLine<'_> {
    let Some(caps) = FIELD_RE.captures(line) else {
        return ProgressLine::Other;
    };

    let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
        return ProgressLine::Other;
    };

    match key.as_str() {
        "out_time_ms" => ProgressLine::OutTime(value.as_str().trim().parse().unwrap_or(0.0)),
        "progress" => ProgressLine::Event(value.as_str()),
        "frame" | "speed" => ProgressLine::Stat(line),
        _ => ProgressLine::Field,
    }
}

/// Percentage of `duration_secs` covered by an elapsed time in microseconds.
/// Not clamped.
pub fn percent_of(out_time_us: f64, duration_secs: f64) -> f64 {
    let elapsed_secs = out_time_us / 1_000_000.0;
    (elapsed_secs / duration_secs) * 100.0
}

/// Read one `\n`-terminated line into `buf`, keeping at most `max` bytes.
///
/// Returns the number of bytes consumed from the reader (0 at end of
/// stream) and whether the line was cut short.
async fn read_capped_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<(usize, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    let mut truncated = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((consumed, truncated));
        }

        let (len, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };

        let room = max.saturating_sub(buf.len());
        if len > room {
            truncated = true;
        }
        buf.extend_from_slice(&available[..len.min(room)]);

        reader.consume(len);
        consumed += len;

        if complete {
            return Ok((consumed, truncated));
        }
    }
}

/// What the parser saw by the time the stream ended
#[derive(Debug, Clone, Default)]
pub struct ParseSummary {
    pub lines: u64,
    pub last_percent: Option<f64>,
    pub ended: bool,
    /// Lines cut to `MAX_LINE_BYTES`
    pub truncated_lines: u64,
    /// Tail of the non-progress output
    pub diagnostics: String,
}

/// Bounded buffer of the most recent non-progress lines
#[derive(Debug, Default)]
struct DiagnosticTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl DiagnosticTail {
    fn push(&mut self, line: &str) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());
        while self.bytes > MAX_DIAGNOSTIC_BYTES {
            match self.lines.pop_front() {
                Some(old) => self.bytes -= old.len() + 1,
                None => break,
            }
        }
    }

    fn into_string(self) -> String {
        Vec::from(self.lines).join("\n")
    }
}

/// Feeds percentages for one job into the progress store.
pub struct ProgressParser {
    job_id: JobId,
    duration_secs: f64,
    store: ProgressStore,
    last_logged: Option<f64>,
    tail: DiagnosticTail,
    summary: ParseSummary,
}

impl ProgressParser {
    pub fn new(job_id: JobId, duration_secs: f64, store: ProgressStore) -> Self {
        Self {
            job_id,
            duration_secs,
            store,
            last_logged: None,
            tail: DiagnosticTail::default(),
            summary: ParseSummary::default(),
        }
    }

    /// Read the stream to its end, updating the store as markers arrive.
    ///
    /// Keeps reading after `progress=end` so the writer never blocks on a
    /// full pipe.
    pub async fn drain<R>(mut self, reader: R) -> ParseSummary
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            match read_capped_line(&mut reader, &mut buf, MAX_LINE_BYTES).await {
                Ok((0, _)) => break,
                Ok((_, truncated)) => {
                    if truncated {
                        self.summary.truncated_lines += 1;
                    }
                    let line = String::from_utf8_lossy(&buf);
                    self.handle_line(line.trim_end_matches(['\n', '\r'])).await;
                }
                Err(e) => {
                    warn!(job_id = %self.job_id, error = %e, "Diagnostic stream read failed");
                    break;
                }
            }
        }

        debug!(
            job_id = %self.job_id,
            lines = self.summary.lines,
            truncated_lines = self.summary.truncated_lines,
            "Diagnostic stream drained"
        );

        let mut summary = self.summary;
        summary.diagnostics = self.tail.into_string();
        summary
    }

    async fn handle_line(&mut self, line: &str) {
        self.summary.lines += 1;

        match classify(line) {
            ProgressLine::OutTime(us) => {
                let pct = percent_of(us, self.duration_secs);
                self.store.set_progress(&self.job_id, pct).await;
                self.summary.last_percent = Some(pct);

                let due = match self.last_logged {
                    None => true,
                    Some(last) => pct - last >= LOG_STEP_PCT,
                };
                if pct < 100.0 && due {
                    info!(
                        job_id = %self.job_id,
                        percent = %format!("{:.1}", pct),
                        elapsed_secs = %format!("{:.1}", us / 1_000_000.0),
                        duration_secs = self.duration_secs,
                        "FFmpeg progress"
                    );
                    self.last_logged = Some(pct);
                }
            }
            ProgressLine::Event(event) => {
                debug!(job_id = %self.job_id, event, "FFmpeg event");
                if event == "end" {
                    self.summary.ended = true;
                }
            }
            ProgressLine::Stat(stat) => {
                debug!(job_id = %self.job_id, stat, "FFmpeg stat");
            }
            ProgressLine::Field => {}
            ProgressLine::Other => {
                if !line.trim().is_empty() {
                    self.tail.push(line);
                }
            }
        }
    }
}
