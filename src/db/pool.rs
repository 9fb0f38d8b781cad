//! SQLite connection pooling.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

use super::migrations;
use crate::error::StorageError;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Open (creating if needed) the database file and run pending migrations.
pub fn init_pool(db_path: &Path) -> Result<DbPool, StorageError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));

    let pool = Pool::builder().max_size(4).build(manager)?;
    migrations::run_migrations(&*get_conn(&pool)?)?;

    Ok(pool)
}

/// In-memory database for tests.
///
/// Every SQLite `:memory:` connection is its own database, so the pool
/// holds exactly one connection.
pub fn init_memory_pool() -> Result<DbPool, StorageError> {
    let manager = SqliteConnectionManager::memory();

    let pool = Pool::builder().max_size(1).build(manager)?;
    migrations::run_migrations(&*get_conn(&pool)?)?;

    Ok(pool)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection, StorageError> {
    Ok(pool.get()?)
}
