//! Schema version tracking and in-place upgrades for `quality.db`.
//!
//! - **Version tracking**: `meta.schema_version` stores the last applied migration
//! - **Idempotent migrations**: each step checks before it alters, safe to re-run
//! - **Ordered**: migrations apply in ascending version, each at most once per DB

use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};

/// Latest schema version this build understands.
pub const SCHEMA_VERSION: u32 = 3;

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: fn(&Connection) -> Result<(), error::QualityError>,
}

/// All migrations in chronological order.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Create users and monitoring_records tables",
            up: migrate_base_tables,
        },
        Migration {
            version: 2,
            description: "Add attachment, routing, category and sign-off columns to older record tables",
            up: migrate_record_columns,
        },
        Migration {
            version: 3,
            description: "Add record_events audit table and status index",
            up: migrate_events_and_indexes,
        },
    ]
}

/// Columns added to `monitoring_records` after its first release.
const LATE_RECORD_COLUMNS: &[(&str, &str)] = &[
    ("attachment_name", "TEXT"),
    ("attachment_data", "TEXT"),
    ("service_level", "TEXT"),
    ("creator_email", "TEXT NOT NULL DEFAULT ''"),
    ("feedback_signature", "TEXT"),
    ("commitment_signature", "TEXT"),
    ("non_critical_error", "TEXT"),
    ("coordinator", "TEXT"),
    ("monitoring_id", "TEXT"),
    ("feedback_date", "TEXT"),
    ("commitment_date", "TEXT"),
];

fn migrate_base_tables(conn: &Connection) -> Result<(), error::QualityError> {
    conn.execute(schemas::USERS_SCHEMA, [])?;
    conn.execute(schemas::RECORDS_SCHEMA, [])?;
    Ok(())
}

fn migrate_record_columns(conn: &Connection) -> Result<(), error::QualityError> {
    for (column, decl) in LATE_RECORD_COLUMNS {
        add_column_if_missing(conn, "monitoring_records", column, decl)?;
    }
    // The first server kept the hash in `users.password`.
    if db::column_exists(conn, "users", "password")?
        && !db::column_exists(conn, "users", "password_hash")?
    {
        conn.execute("ALTER TABLE users RENAME COLUMN password TO password_hash", [])?;
        tracing::info!("renamed users.password to password_hash");
    }
    add_column_if_missing(conn, "users", "role", "TEXT NOT NULL DEFAULT 'AGENT'")?;
    add_column_if_missing(conn, "users", "created_at", "TEXT NOT NULL DEFAULT ''")?;
    Ok(())
}

fn migrate_events_and_indexes(conn: &Connection) -> Result<(), error::QualityError> {
    conn.execute(schemas::RECORD_EVENTS_SCHEMA, [])?;
    conn.execute(schemas::RECORD_EVENTS_INDEX, [])?;
    conn.execute(schemas::RECORDS_STATUS_INDEX, [])?;
    Ok(())
}

pub fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<bool, error::QualityError> {
    if db::column_exists(conn, table, column)? {
        return Ok(false);
    }
    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl),
        [],
    )?;
    tracing::info!(table, column, "added missing column");
    Ok(true)
}

pub fn current_version(conn: &Connection) -> Result<u32, error::QualityError> {
    conn.execute(schemas::META_SCHEMA, [])?;
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        None => Ok(0),
        Some(v) => v.parse::<u32>().map_err(|_| {
            error::QualityError::Corrupt(format!("unreadable schema_version '{}'", v))
        }),
    }
}

/// Bring the schema up to `SCHEMA_VERSION`. Caller supplies the transaction.
///
/// Returns the versions that were applied.
pub fn ensure_schema(conn: &Connection) -> Result<Vec<u32>, error::QualityError> {
    let current = current_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(error::QualityError::Corrupt(format!(
            "database schema v{} is newer than this build (v{})",
            current, SCHEMA_VERSION
        )));
    }

    let mut applied = Vec::new();
    for m in all_migrations().into_iter().filter(|m| m.version > current) {
        tracing::info!(version = m.version, description = m.description, "applying migration");
        (m.up)(conn)?;
        conn.execute(
            "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [m.version.to_string()],
        )?;
        applied.push(m.version);
    }
    Ok(applied)
}
