use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default busy timeout for ad-hoc connections, in seconds.
const DEFAULT_BUSY_TIMEOUT_SECS: u32 = 5;

pub fn db_connect(db_path: &str) -> Result<Connection, error::QualityError> {
    db_connect_pooled(db_path, DEFAULT_BUSY_TIMEOUT_SECS)
}

/// Open a connection with WAL journaling, foreign keys and the given busy timeout.
pub fn db_connect_pooled(
    db_path: &str,
    busy_timeout_secs: u32,
) -> Result<Connection, error::QualityError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(u64::from(busy_timeout_secs)))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

pub fn quality_db_path(root: &Path) -> PathBuf {
    root.join(schemas::QUALITY_DB_NAME)
}

/// True when `table` already has a column named `column`.
pub fn column_exists(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<bool, error::QualityError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}
