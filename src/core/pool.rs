//! SQLite connection access with read/write separation and retry logic.
//!
//! - Maintains a **write mutex** per DB so in-process writers never interleave
//! - Creates fresh **read connections** per operation (no mutex, concurrent via WAL)
//! - Retries `BEGIN IMMEDIATE` on busy/locked with bounded exponential backoff,
//!   which covers writers in other processes sharing the same store
//!
//! Connections are opened fresh each time rather than cached, so a store directory
//! can be shared by several CLI invocations without stale WAL/SHM handles.

use crate::core::db;
use crate::core::error::QualityError;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

/// Maximum retry attempts for busy/locked errors.
const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 50;
/// Maximum delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 2_000;

const WRITE_BUSY_TIMEOUT_SECS: u32 = 5;
const READ_BUSY_TIMEOUT_SECS: u32 = 5;

/// Per-database entry holding a write mutex for serialized write access.
struct PoolEntry {
    write_lock: Mutex<()>,
    db_path: PathBuf,
}

pub struct SqlitePool {
    entries: Mutex<HashMap<PathBuf, Arc<PoolEntry>>>,
}

impl SqlitePool {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_entry(&self, db_path: &Path) -> Result<Arc<PoolEntry>, QualityError> {
        let key = db_path.to_path_buf();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| QualityError::Corrupt("SqlitePool entries lock poisoned".to_string()))?;
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            Arc::new(PoolEntry {
                write_lock: Mutex::new(()),
                db_path: key,
            })
        });
        Ok(Arc::clone(entry))
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction while holding the DB's write lock.
    ///
    /// `Ok` commits. `Err` rolls back, so a rejected operation never leaves a partial write.
    pub fn with_write<F, R>(&self, db_path: &Path, f: F) -> Result<R, QualityError>
    where
        F: FnOnce(&Connection) -> Result<R, QualityError>,
    {
        let entry = self.get_entry(db_path)?;
        let _guard = entry
            .write_lock
            .lock()
            .map_err(|_| QualityError::Corrupt("Pool write lock poisoned".to_string()))?;

        let conn =
            db::db_connect_pooled(&entry.db_path.to_string_lossy(), WRITE_BUSY_TIMEOUT_SECS)?;
        retry_on_busy(|| {
            conn.execute_batch("BEGIN IMMEDIATE;")
                .map_err(QualityError::RusqliteError)
        })?;

        match f(&conn) {
            Ok(value) => match conn.execute_batch("COMMIT;") {
                Ok(()) => Ok(value),
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK;");
                    Err(QualityError::RusqliteError(e))
                }
            },
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    /// Execute a closure with a read connection (no mutex serialization).
    pub fn with_read<F, R>(&self, db_path: &Path, f: F) -> Result<R, QualityError>
    where
        F: FnOnce(&Connection) -> Result<R, QualityError>,
    {
        let conn = db::db_connect_pooled(&db_path.to_string_lossy(), READ_BUSY_TIMEOUT_SECS)?;
        f(&conn)
    }
}

fn retry_on_busy<F, R>(mut f: F) -> Result<R, QualityError>
where
    F: FnMut() -> Result<R, QualityError>,
{
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy_error(&e) && attempt < MAX_RETRIES => {
                attempt += 1;
                let delay_ms = (BASE_DELAY_MS * 2u64.pow(attempt - 1)).min(MAX_DELAY_MS);
                tracing::debug!(attempt, delay_ms, "sqlite busy, retrying");
                thread::sleep(Duration::from_millis(delay_ms));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if an error is a SQLite busy/locked error that is retryable.
fn is_busy_error(err: &QualityError) -> bool {
    match err {
        QualityError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

/// Global pool instance (same lifetime as the process).
pub fn global_pool() -> &'static SqlitePool {
    static POOL: OnceLock<SqlitePool> = OnceLock::new();
    POOL.get_or_init(SqlitePool::new)
}
