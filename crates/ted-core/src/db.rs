use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::{Result, TedError};
use crate::schema::run_migrations;

// ---------------------------------------------------------------------------
// Pool type alias
// ---------------------------------------------------------------------------

pub type DbPool = Pool<SqliteConnectionManager>;

// ---------------------------------------------------------------------------
// Pool constructors
// ---------------------------------------------------------------------------

/// Open a connection pool backed by a file-based SQLite database, running
/// migrations once up front.
pub fn create_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(16)
        .build(manager)
        .map_err(|e| TedError::Pool(e.to_string()))?;

    let conn = pool.get().map_err(|e| TedError::Pool(e.to_string()))?;
    run_migrations(&conn)?;

    Ok(pool)
}

/// Open a connection pool backed by a private in-memory SQLite database, for
/// tests.
pub fn create_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory().with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| TedError::Pool(e.to_string()))?;

    let conn = pool.get().map_err(|e| TedError::Pool(e.to_string()))?;
    run_migrations(&conn)?;

    Ok(pool)
}
