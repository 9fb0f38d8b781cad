use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::AppState;
use crate::db::{NewVideo, VideoRecord};
use crate::error::AppError;
use crate::job::JobId;
use crate::storage;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub job_id: JobId,
    pub hls_url: String,
    pub video: VideoRecord,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub id: String,
    /// Percentage with two decimals
    pub progress: String,
    pub status: &'static str,
}

/// `POST /api/upload`
///
/// Expects a multipart `file` field. An optional `job_id` text field sent
/// before it lets the client pick the id it will poll progress with; an id
/// already used by a running job or a stored video is rejected with 409.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut requested_id: Option<JobId> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let id = JobId::parse(text.trim())
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid job id: {}", text)))?;
                requested_id = Some(id);
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("File field has no file name".into()))?;
                let job_id = requested_id.take().unwrap_or_else(JobId::generate);

                // Recorded ids outlive the in-memory progress entries
                if state.videos.job_id_exists(job_id.as_str()).await?
                    || !state.orchestrator.begin(&job_id).await
                {
                    return Err(AppError::Conflict(job_id.to_string()));
                }

                info!(job_id = %job_id, file_name = %file_name, "Upload started");
                let orchestrator = &state.orchestrator;

                let upload = orchestrator.store_upload(&job_id, &file_name, field).await?;
                let output = orchestrator.convert(&upload).await?;

                let video = state
                    .videos
                    .create(NewVideo {
                        job_id: job_id.to_string(),
                        filename: upload.file_name.clone(),
                        path: upload.path.display().to_string(),
                        hls_path: output.manifest_url.clone(),
                        file_size: i64::try_from(upload.size).unwrap_or(i64::MAX),
                    })
                    .await?;

                return Ok(Json(UploadResponse {
                    message: "Upload & convert success",
                    job_id,
                    hls_url: output.manifest_url,
                    video,
                }));
            }
            _ => continue,
        }
    }

    Err(AppError::BadRequest("Missing file field".into()))
}

/// `GET /progress/:id`
pub async fn progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ProgressResponse> {
    let (percent, status) = match state.progress.snapshot(&id).await {
        Some(p) => (p.percent, p.state.as_str()),
        None => (0.0, "unknown"),
    };

    Json(ProgressResponse {
        id,
        progress: format!("{:.2}", percent),
        status,
    })
}

/// `GET /api/videos`
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoRecord>>, AppError> {
    Ok(Json(state.videos.list().await?))
}

/// `DELETE /api/videos/:id`
///
/// File removal is best-effort; the record is deleted even when the files
/// are already gone.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid video ID".into()))?;

    let video = state.videos.get(id).await?.ok_or(AppError::NotFound(id))?;

    storage::remove_file_best_effort(std::path::Path::new(&video.path)).await;

    match JobId::parse(&video.job_id) {
        Some(job_id) => {
            let output_dir = state.config.job_output_dir(job_id.as_str());
            storage::remove_dir_best_effort(&output_dir).await;
        }
        None => warn!(video_id = id, job_id = %video.job_id, "Refusing to delete output for invalid job id"),
    }

    if !state.videos.delete(id).await? {
        return Err(AppError::NotFound(id));
    }

    info!(video_id = id, job_id = %video.job_id, "Video deleted");
    Ok(Json(json!({ "message": "Video deleted successfully" })))
}
