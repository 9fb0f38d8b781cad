use axum::body::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

use super::{JobId, JobState, ProgressStore};
use crate::config::{Config, MANIFEST_NAME};
use crate::error::{StorageError, VideoError};
use crate::storage;
use crate::video::ffmpeg::{check_exit, HlsCommand};
use crate::video::metadata::{effective_duration, probe_duration};
use crate::video::progress::{ParseSummary, ProgressParser};

/// An input file persisted for a job
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub job_id: JobId,
    /// Sanitized client file name
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Result of a successful conversion
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub job_id: JobId,
    pub manifest_path: PathBuf,
    /// Public URL of the manifest
    pub manifest_url: String,
    pub duration_secs: f64,
}

/// Drives one upload through probe, transcode and finalization.
pub struct JobOrchestrator {
    config: Arc<Config>,
    progress: ProgressStore,
}

impl JobOrchestrator {
    pub fn new(config: Arc<Config>, progress: ProgressStore) -> Self {
        Self { config, progress }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Register a job so that polling sees it before any work starts.
    ///
    /// Returns false if the id already belongs to another job.
    #[must_use]
    pub async fn begin(&self, job_id: &JobId) -> bool {
        let registered = self.progress.try_register(job_id).await;
        if !registered {
            warn!(job_id = %job_id, "Job id already in use");
        }
        registered
    }

    /// Persist the uploaded bytes under a path keyed by the job id.
    pub async fn store_upload<S, E>(
        &self,
        job_id: &JobId,
        file_name: &str,
        body: S,
    ) -> Result<StoredUpload, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let result = self.write_upload(job_id, file_name, body).await;
        if let Err(e) = &result {
            error!(job_id = %job_id, error = %e, "Failed to store upload");
            self.progress.set_state(job_id, JobState::Failed).await;
        }
        result
    }

    async fn write_upload<S, E>(
        &self,
        job_id: &JobId,
        file_name: &str,
        body: S,
    ) -> Result<StoredUpload, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let file_name = storage::sanitize_file_name(file_name)?;
        fs::create_dir_all(&self.config.upload_dir).await?;

        let path = self
            .config
            .upload_dir
            .join(format!("{}_{}", job_id, file_name));
        let size = storage::stream_to_file(&path, body).await?;

        info!(job_id = %job_id, path = %path.display(), size, "Saved upload");

        Ok(StoredUpload {
            job_id: job_id.clone(),
            file_name,
            path,
            size,
        })
    }

    /// Convert a stored upload to HLS, tracking progress in the store.
    ///
    /// On failure the job is marked failed and its progress is left at the
    /// last parsed value. Partial output stays on disk.
    pub async fn convert(&self, upload: &StoredUpload) -> Result<ConversionOutput, VideoError> {
        let job_id = &upload.job_id;

        match self.run_conversion(upload).await {
            Ok(output) => {
                self.progress.set_state(job_id, JobState::Done).await;
                info!(
                    job_id = %job_id,
                    manifest = %output.manifest_path.display(),
                    "Conversion complete"
                );
                Ok(output)
            }
            Err(e) => {
                self.progress.set_state(job_id, JobState::Failed).await;
                error!(job_id = %job_id, error = %e, "Conversion failed");
                Err(e)
            }
        }
    }

    async fn run_conversion(&self, upload: &StoredUpload) -> Result<ConversionOutput, VideoError> {
        let job_id = &upload.job_id;

        self.progress.set_state(job_id, JobState::Probing).await;
        info!(job_id = %job_id, input = %upload.path.display(), "Probing duration");
        let reported = probe_duration(&upload.path, &self.config.ffprobe_path).await?;
        let duration_secs = effective_duration(reported);

        let output_dir = self.config.job_output_dir(job_id.as_str());
        fs::create_dir_all(&output_dir).await?;
        let manifest_path = output_dir.join(MANIFEST_NAME);

        self.progress.set_state(job_id, JobState::Converting).await;
        info!(
            job_id = %job_id,
            input = %upload.path.display(),
            output = %manifest_path.display(),
            duration_secs,
            "Starting HLS transcode"
        );

        let mut process =
            HlsCommand::new(&upload.path, &manifest_path).spawn(&self.config.ffmpeg_path)?;
        debug!(job_id = %job_id, pid = ?process.pid(), "FFmpeg started");

        let parser = process.take_diagnostics().map(|stderr| {
            let parser = ProgressParser::new(job_id.clone(), duration_secs, self.progress.clone());
            tokio::spawn(parser.drain(stderr))
        });

        let status = process.wait().await;

        // The parser must finish reading before the job can complete
        let summary = match parser {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(job_id = %job_id, error = %e, "Progress parser task failed");
                ParseSummary::default()
            }),
            None => ParseSummary::default(),
        };

        check_exit(status?, summary.diagnostics)?;
        self.progress.set_state(job_id, JobState::Finalizing).await;

        debug!(
            job_id = %job_id,
            last_percent = ?summary.last_percent,
            ended = summary.ended,
            "Finalizing"
        );
        self.progress.set_progress(job_id, 100.0).await;

        Ok(ConversionOutput {
            job_id: job_id.clone(),
            manifest_path,
            manifest_url: Config::manifest_url(job_id.as_str()),
            duration_secs,
        })
    }
}
