//! Centralized database schema definitions.
//!
//! QualityGuard keeps all lifecycle state in one SQLite bin (`quality.db`):
//! 1. users: credential and role records.
//! 2. monitoring_records: call-quality incidents and their sign-offs.
//! 3. record_events: append-only audit of every record mutation.
//!
//! Column additions for databases created by older builds live in
//! `migration.rs`; the statements here always describe the current shape.

pub const QUALITY_DB_NAME: &str = "quality.db";
pub const RECORD_EVENTS_NAME: &str = "records.events.jsonl";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const META_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const USERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        email TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'AGENT'
            CHECK (role IN ('AGENT', 'SUPERVISOR', 'QUALITY_ANALYST')),
        created_at TEXT NOT NULL DEFAULT ''
    )
";

pub const RECORDS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS monitoring_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        call_details TEXT NOT NULL,
        agent_name TEXT NOT NULL,
        registration_date TEXT NOT NULL,
        call_date TEXT NOT NULL,
        creator_email TEXT NOT NULL,
        coordinator TEXT,
        monitoring_id TEXT,
        service_level TEXT,
        attachment_name TEXT,
        attachment_data TEXT,
        end_user_error TEXT,
        business_critical_error TEXT,
        compliance_error TEXT,
        non_critical_error TEXT,
        supervisor_feedback TEXT,
        feedback_date TEXT,
        feedback_signature TEXT,
        agent_commitment TEXT,
        commitment_date TEXT,
        commitment_signature TEXT,
        status TEXT NOT NULL DEFAULT 'PENDING_FEEDBACK'
    )
";

pub const RECORD_EVENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS record_events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT NOT NULL UNIQUE,
        ts TEXT NOT NULL,
        event_type TEXT NOT NULL,
        record_id INTEGER NOT NULL,
        actor TEXT NOT NULL,
        payload TEXT NOT NULL
    )
";

pub const RECORD_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_record_events_record ON record_events(record_id)";

pub const RECORDS_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_status ON monitoring_records(status)";
