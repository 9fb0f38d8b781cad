//! Video metadata persistence on SQLite.
//!
//! - `migrations` - embedded schema migrations
//! - `pool` - r2d2 connection pool
//! - `videos` - record model and queries
//!
//! Queries are synchronous; [`VideoRepository`] runs them on the blocking
//! thread pool for use from async handlers.

pub mod migrations;
pub mod pool;
pub mod videos;

pub use pool::{init_memory_pool, init_pool, DbPool};
pub use videos::{NewVideo, VideoRecord};

use rusqlite::Connection;

use crate::error::StorageError;

#[derive(Clone)]
pub struct VideoRepository {
    pool: DbPool,
}

impl VideoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let db = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool::get_conn(&db)?;
            f(&*conn)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }

    pub async fn create(&self, video: NewVideo) -> Result<VideoRecord, StorageError> {
        self.with_conn(move |conn| videos::create_video(conn, &video))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<VideoRecord>, StorageError> {
        self.with_conn(move |conn| videos::get_video(conn, id)).await
    }

    pub async fn job_id_exists(&self, job_id: &str) -> Result<bool, StorageError> {
        let job_id = job_id.to_string();
        self.with_conn(move |conn| videos::job_id_exists(conn, &job_id))
            .await
    }

    pub async fn list(&self) -> Result<Vec<VideoRecord>, StorageError> {
        self.with_conn(videos::list_videos).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| videos::delete_video(conn, id))
            .await
    }
}
