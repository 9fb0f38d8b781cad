//! Video record queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::StorageError;

/// Metadata for one uploaded and converted video
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoRecord {
    pub id: i64,
    pub job_id: String,
    /// Original client file name
    pub filename: String,
    /// Where the uploaded input is stored
    pub path: String,
    /// Public manifest URL
    pub hls_path: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when inserting a record
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub job_id: String,
    pub filename: String,
    pub path: String,
    pub hls_path: String,
    pub file_size: i64,
}

const COLUMNS: &str = "id, job_id, filename, path, hls_path, file_size, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(VideoRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        filename: row.get(2)?,
        path: row.get(3)?,
        hls_path: row.get(4)?,
        file_size: row.get(5)?,
        created_at,
    })
}

pub fn create_video(conn: &Connection, video: &NewVideo) -> Result<VideoRecord, StorageError> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO videos (job_id, filename, path, hls_path, file_size, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            video.job_id,
            video.filename,
            video.path,
            video.hls_path,
            video.file_size,
            now.to_rfc3339(),
        ],
    )?;

    Ok(VideoRecord {
        id: conn.last_insert_rowid(),
        job_id: video.job_id.clone(),
        filename: video.filename.clone(),
        path: video.path.clone(),
        hls_path: video.hls_path.clone(),
        file_size: video.file_size,
        created_at: now,
    })
}

pub fn get_video(conn: &Connection, id: i64) -> Result<Option<VideoRecord>, StorageError> {
    let sql = format!("SELECT {} FROM videos WHERE id = ?", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Whether any record uses `job_id`
pub fn job_id_exists(conn: &Connection, job_id: &str) -> Result<bool, StorageError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM videos WHERE job_id = ?)",
        [job_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// All records, oldest first
pub fn list_videos(conn: &Connection) -> Result<Vec<VideoRecord>, StorageError> {
    let sql = format!("SELECT {} FROM videos ORDER BY id", COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let videos = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(videos)
}

/// Delete a record. Returns whether a row was removed.
pub fn delete_video(conn: &Connection, id: i64) -> Result<bool, StorageError> {
    let deleted = conn.execute("DELETE FROM videos WHERE id = ?", [id])?;
    Ok(deleted > 0)
}
