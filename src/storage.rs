//! Local file storage for uploads and HLS output.

use axum::body::Bytes;
use futures::{Stream, TryStreamExt};
use std::io;
use std::path::{Component, Path};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use crate::error::StorageError;

/// Reduce a client-supplied file name to a single safe path component.
pub fn sanitize_file_name(name: &str) -> Result<String, StorageError> {
    // Browsers on Windows may send a full path
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    let mut components = Path::new(last).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| StorageError::InvalidFileName(name.to_string())),
        _ => Err(StorageError::InvalidFileName(name.to_string())),
    }
}

/// Save a byte stream to `path`, returning the number of bytes written.
pub async fn stream_to_file<S, E>(path: &Path, stream: S) -> Result<u64, StorageError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;

    Ok(written)
}

/// Remove a file, logging instead of failing. Returns whether it was removed.
pub async fn remove_file_best_effort(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Deleted stored file");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete stored file");
            false
        }
    }
}

/// Remove a directory tree, logging instead of failing.
pub async fn remove_dir_best_effort(path: &Path) -> bool {
    match fs::remove_dir_all(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Deleted directory");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete directory");
            false
        }
    }
}
