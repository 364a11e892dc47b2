use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time;
use clap::ValueEnum;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::ToSql};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Column order shared by every SELECT that feeds `RecordRow::from_row`.
const RECORD_COLUMNS: &str = "id, call_details, agent_name, registration_date, call_date, \
     creator_email, coordinator, monitoring_id, service_level, attachment_name, attachment_data, \
     end_user_error, business_critical_error, compliance_error, non_critical_error, \
     supervisor_feedback, feedback_date, feedback_signature, \
     agent_commitment, commitment_date, commitment_signature, status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    PendingFeedback,
    PendingCommitment,
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::PendingFeedback => "PENDING_FEEDBACK",
            RecordStatus::PendingCommitment => "PENDING_COMMITMENT",
            RecordStatus::Completed => "COMPLETED",
        }
    }

    /// Status is a function of which sign-offs are present. A commitment
    /// without feedback has no valid status.
    pub fn derive(
        feedback_present: bool,
        commitment_present: bool,
    ) -> Result<Self, error::QualityError> {
        match (feedback_present, commitment_present) {
            (false, false) => Ok(RecordStatus::PendingFeedback),
            (true, false) => Ok(RecordStatus::PendingCommitment),
            (true, true) => Ok(RecordStatus::Completed),
            (false, true) => Err(error::QualityError::Corrupt(
                "commitment present without feedback".to_string(),
            )),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = error::QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDING_FEEDBACK" => Ok(RecordStatus::PendingFeedback),
            "PENDING_COMMITMENT" => Ok(RecordStatus::PendingCommitment),
            "COMPLETED" => Ok(RecordStatus::Completed),
            other => Err(error::QualityError::validation(
                "status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// Encoded payload as supplied by the client (typically a base64 data URL).
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCategories {
    pub end_user: String,
    pub business_critical: String,
    pub compliance: String,
    pub non_critical: String,
}

/// A supervisor feedback or agent commitment. `signature` is the signer's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOff {
    pub text: String,
    pub date: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringRecord {
    pub id: i64,
    pub call_details: String,
    pub agent_name: String,
    pub registration_date: String,
    pub call_date: String,
    pub creator_email: String,
    pub coordinator: Option<String>,
    pub monitoring_id: Option<String>,
    pub service_level: Option<String>,
    pub attachment: Option<Attachment>,
    pub errors: ErrorCategories,
    pub feedback: Option<SignOff>,
    pub commitment: Option<SignOff>,
    pub status: RecordStatus,
}

/// Creation payload. Status, sign-offs, id and creator are never client-supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRecord {
    pub call_details: String,
    pub agent_name: String,
    pub call_date: String,
    pub coordinator: String,
    #[serde(default)]
    pub monitoring_id: Option<String>,
    #[serde(default)]
    pub service_level: Option<String>,
    #[serde(default)]
    pub attachment_name: Option<String>,
    #[serde(default)]
    pub attachment_data: Option<String>,
    pub end_user_error: String,
    pub business_critical_error: String,
    pub compliance_error: String,
    pub non_critical_error: String,
}

/// Editable fields of a PENDING_FEEDBACK record. Anything else is rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordPatch {
    #[serde(default)]
    pub call_details: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub call_date: Option<String>,
    #[serde(default)]
    pub coordinator: Option<String>,
    #[serde(default)]
    pub monitoring_id: Option<String>,
    #[serde(default)]
    pub service_level: Option<String>,
    #[serde(default)]
    pub attachment_name: Option<String>,
    #[serde(default)]
    pub attachment_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFilter {
    #[serde(default)]
    pub coordinator: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub event_id: String,
    pub ts: String,
    pub event_type: String,
    pub record_id: i64,
    pub actor: String,
    pub payload: JsonValue,
}

impl RecordEvent {
    pub fn new(event_type: &str, record_id: i64, actor: &str, payload: JsonValue) -> Self {
        Self {
            event_id: time::new_event_id(),
            ts: time::now_epoch_z(),
            event_type: event_type.to_string(),
            record_id,
            actor: actor.to_string(),
            payload,
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, error::QualityError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(error::QualityError::validation(
            field,
            format!("{} is required", field),
        ));
    }
    Ok(v.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn attachment_pair(
    name: &Option<String>,
    data: &Option<String>,
) -> Result<Option<Attachment>, error::QualityError> {
    match (optional(name), optional(data)) {
        (Some(name), Some(data)) => Ok(Some(Attachment { name, data })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(error::QualityError::validation(
            "attachment_data",
            "attachment_name given without attachment_data",
        )),
        (None, Some(_)) => Err(error::QualityError::validation(
            "attachment_name",
            "attachment_data given without attachment_name",
        )),
    }
}

/// A creation payload after validation: trimmed, dated, defaults applied.
#[derive(Debug, Clone)]
pub(crate) struct ValidRecord {
    pub call_details: String,
    pub agent_name: String,
    pub call_date: String,
    pub coordinator: String,
    pub monitoring_id: Option<String>,
    pub service_level: String,
    pub attachment: Option<Attachment>,
    pub errors: ErrorCategories,
}

impl NewRecord {
    pub(crate) fn validate(
        &self,
        default_service_level: &str,
    ) -> Result<ValidRecord, error::QualityError> {
        let call_details = required("call_details", &self.call_details)?;
        let agent_name = required("agent_name", &self.agent_name)?;
        let call_date = required("call_date", &self.call_date)?;
        time::parse_date("call_date", &call_date)?;
        let coordinator = required("coordinator", &self.coordinator)?;
        let errors = ErrorCategories {
            end_user: required("end_user_error", &self.end_user_error)?,
            business_critical: required("business_critical_error", &self.business_critical_error)?,
            compliance: required("compliance_error", &self.compliance_error)?,
            non_critical: required("non_critical_error", &self.non_critical_error)?,
        };
        let attachment = attachment_pair(&self.attachment_name, &self.attachment_data)?;
        Ok(ValidRecord {
            call_details,
            agent_name,
            call_date,
            coordinator,
            monitoring_id: optional(&self.monitoring_id),
            service_level: optional(&self.service_level)
                .unwrap_or_else(|| default_service_level.to_string()),
            attachment,
            errors,
        })
    }
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self == &RecordPatch::default()
    }

    /// Validated `(column, value)` assignments. `None` clears an optional column.
    /// A blank service level falls back to the default, as at creation.
    pub(crate) fn assignments(
        &self,
        default_service_level: &str,
    ) -> Result<Vec<(&'static str, Option<String>)>, error::QualityError> {
        if self.is_empty() {
            return Err(error::QualityError::validation(
                "patch",
                "no editable fields supplied",
            ));
        }
        let mut out = Vec::new();
        if let Some(v) = &self.call_details {
            out.push(("call_details", Some(required("call_details", v)?)));
        }
        if let Some(v) = &self.agent_name {
            out.push(("agent_name", Some(required("agent_name", v)?)));
        }
        if let Some(v) = &self.call_date {
            let v = required("call_date", v)?;
            time::parse_date("call_date", &v)?;
            out.push(("call_date", Some(v)));
        }
        if let Some(v) = &self.coordinator {
            out.push(("coordinator", Some(required("coordinator", v)?)));
        }
        if self.monitoring_id.is_some() {
            out.push(("monitoring_id", optional(&self.monitoring_id)));
        }
        if self.service_level.is_some() {
            let level = optional(&self.service_level)
                .unwrap_or_else(|| default_service_level.to_string());
            out.push(("service_level", Some(level)));
        }
        if self.attachment_name.is_some() || self.attachment_data.is_some() {
            let attachment = attachment_pair(&self.attachment_name, &self.attachment_data)?;
            let (name, data) = match attachment {
                Some(a) => (Some(a.name), Some(a.data)),
                None => (None, None),
            };
            out.push(("attachment_name", name));
            out.push(("attachment_data", data));
        }
        Ok(out)
    }
}

struct RecordRow {
    id: i64,
    call_details: String,
    agent_name: String,
    registration_date: String,
    call_date: String,
    creator_email: String,
    coordinator: Option<String>,
    monitoring_id: Option<String>,
    service_level: Option<String>,
    attachment_name: Option<String>,
    attachment_data: Option<String>,
    end_user_error: Option<String>,
    business_critical_error: Option<String>,
    compliance_error: Option<String>,
    non_critical_error: Option<String>,
    supervisor_feedback: Option<String>,
    feedback_date: Option<String>,
    feedback_signature: Option<String>,
    agent_commitment: Option<String>,
    commitment_date: Option<String>,
    commitment_signature: Option<String>,
    status: Option<String>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            call_details: row.get(1)?,
            agent_name: row.get(2)?,
            registration_date: row.get(3)?,
            call_date: row.get(4)?,
            creator_email: row.get(5)?,
            coordinator: row.get(6)?,
            monitoring_id: row.get(7)?,
            service_level: row.get(8)?,
            attachment_name: row.get(9)?,
            attachment_data: row.get(10)?,
            end_user_error: row.get(11)?,
            business_critical_error: row.get(12)?,
            compliance_error: row.get(13)?,
            non_critical_error: row.get(14)?,
            supervisor_feedback: row.get(15)?,
            feedback_date: row.get(16)?,
            feedback_signature: row.get(17)?,
            agent_commitment: row.get(18)?,
            commitment_date: row.get(19)?,
            commitment_signature: row.get(20)?,
            status: row.get(21)?,
        })
    }

    fn into_record(self) -> Result<MonitoringRecord, error::QualityError> {
        let feedback = self.supervisor_feedback.map(|text| SignOff {
            text,
            date: self.feedback_date.unwrap_or_default(),
            signature: self.feedback_signature.unwrap_or_default(),
        });
        let commitment = self.agent_commitment.map(|text| SignOff {
            text,
            date: self.commitment_date.unwrap_or_default(),
            signature: self.commitment_signature.unwrap_or_default(),
        });

        let derived = RecordStatus::derive(feedback.is_some(), commitment.is_some())
            .map_err(|e| error::QualityError::Corrupt(format!("record {}: {}", self.id, e)))?;
        let stored = self.status.as_deref().unwrap_or(RecordStatus::PendingFeedback.as_str());
        let stored = stored.parse::<RecordStatus>().map_err(|_| {
            error::QualityError::Corrupt(format!(
                "record {} has unknown status '{}'",
                self.id, stored
            ))
        })?;
        if stored != derived {
            return Err(error::QualityError::Corrupt(format!(
                "record {} is stored as {} but its sign-offs say {}",
                self.id, stored, derived
            )));
        }

        let attachment = match (self.attachment_name, self.attachment_data) {
            (Some(name), Some(data)) => Some(Attachment { name, data }),
            _ => None,
        };

        Ok(MonitoringRecord {
            id: self.id,
            call_details: self.call_details,
            agent_name: self.agent_name,
            registration_date: self.registration_date,
            call_date: self.call_date,
            creator_email: self.creator_email,
            coordinator: self.coordinator,
            monitoring_id: self.monitoring_id,
            service_level: self.service_level,
            attachment,
            errors: ErrorCategories {
                end_user: self.end_user_error.unwrap_or_default(),
                business_critical: self.business_critical_error.unwrap_or_default(),
                compliance: self.compliance_error.unwrap_or_default(),
                non_critical: self.non_critical_error.unwrap_or_default(),
            },
            feedback,
            commitment,
            status: derived,
        })
    }
}

/// Schema is owned by `users::initialize_users_db`; this only verifies the table is readable.
pub fn initialize_records_db(root: &Path) -> Result<(), error::QualityError> {
    let broker = DbBroker::new(root);
    let db_path = db::quality_db_path(root);
    broker.with_read(&db_path, "qualityguard", "records.init", |conn| {
        conn.query_row("SELECT COUNT(*) FROM monitoring_records", [], |r| {
            r.get::<_, i64>(0)
        })?;
        Ok(())
    })
}

pub(crate) fn load_record(
    conn: &Connection,
    id: i64,
) -> Result<Option<MonitoringRecord>, error::QualityError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM monitoring_records WHERE id = ?1", RECORD_COLUMNS),
            params![id],
            RecordRow::from_row,
        )
        .optional()?;
    row.map(RecordRow::into_record).transpose()
}

pub(crate) fn insert_record(
    conn: &Connection,
    rec: &ValidRecord,
    creator_email: &str,
    registration_date: &str,
) -> Result<i64, error::QualityError> {
    let (attachment_name, attachment_data) = match &rec.attachment {
        Some(a) => (Some(a.name.as_str()), Some(a.data.as_str())),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO monitoring_records (
            call_details, agent_name, registration_date, call_date, creator_email,
            coordinator, monitoring_id, service_level, attachment_name, attachment_data,
            end_user_error, business_critical_error, compliance_error, non_critical_error,
            status
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            rec.call_details,
            rec.agent_name,
            registration_date,
            rec.call_date,
            creator_email,
            rec.coordinator,
            rec.monitoring_id,
            rec.service_level,
            attachment_name,
            attachment_data,
            rec.errors.end_user,
            rec.errors.business_critical,
            rec.errors.compliance,
            rec.errors.non_critical,
            RecordStatus::PendingFeedback.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Apply validated assignments, guarded on PENDING_FEEDBACK. Returns rows changed.
pub(crate) fn update_fields(
    conn: &Connection,
    id: i64,
    assignments: &[(&'static str, Option<String>)],
) -> Result<usize, error::QualityError> {
    let sets: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect();
    let sql = format!(
        "UPDATE monitoring_records SET {} WHERE id = ?{} AND status = ?{} AND supervisor_feedback IS NULL",
        sets.join(", "),
        assignments.len() + 1,
        assignments.len() + 2,
    );
    let status = RecordStatus::PendingFeedback.as_str();
    let mut values: Vec<&dyn ToSql> = assignments.iter().map(|(_, v)| v as &dyn ToSql).collect();
    values.push(&id);
    values.push(&status);
    Ok(conn.execute(&sql, params_from_iter(values))?)
}

pub(crate) fn delete_row(conn: &Connection, id: i64) -> Result<usize, error::QualityError> {
    Ok(conn.execute(
        "DELETE FROM monitoring_records
         WHERE id = ?1 AND status = ?2 AND supervisor_feedback IS NULL",
        params![id, RecordStatus::PendingFeedback.as_str()],
    )?)
}

/// One-shot feedback write. Touches 0 rows unless feedback is still absent.
pub(crate) fn set_feedback(
    conn: &Connection,
    id: i64,
    sign: &SignOff,
) -> Result<usize, error::QualityError> {
    Ok(conn.execute(
        "UPDATE monitoring_records
         SET supervisor_feedback = ?1, feedback_date = ?2, feedback_signature = ?3, status = ?4
         WHERE id = ?5 AND status = ?6 AND supervisor_feedback IS NULL",
        params![
            sign.text,
            sign.date,
            sign.signature,
            RecordStatus::PendingCommitment.as_str(),
            id,
            RecordStatus::PendingFeedback.as_str(),
        ],
    )?)
}

/// One-shot commitment write. Requires feedback present and commitment absent.
pub(crate) fn set_commitment(
    conn: &Connection,
    id: i64,
    sign: &SignOff,
) -> Result<usize, error::QualityError> {
    Ok(conn.execute(
        "UPDATE monitoring_records
         SET agent_commitment = ?1, commitment_date = ?2, commitment_signature = ?3, status = ?4
         WHERE id = ?5 AND status = ?6
           AND supervisor_feedback IS NOT NULL AND agent_commitment IS NULL",
        params![
            sign.text,
            sign.date,
            sign.signature,
            RecordStatus::Completed.as_str(),
            id,
            RecordStatus::PendingCommitment.as_str(),
        ],
    )?)
}

pub(crate) fn insert_event(conn: &Connection, ev: &RecordEvent) -> Result<(), error::QualityError> {
    conn.execute(
        "INSERT INTO record_events(event_id, ts, event_type, record_id, actor, payload)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ev.event_id,
            ev.ts,
            ev.event_type,
            ev.record_id,
            ev.actor,
            serde_json::to_string(&ev.payload)?,
        ],
    )?;
    Ok(())
}

/// Append committed events to `records.events.jsonl`. Failure here is logged, not returned:
/// the `record_events` table already holds the event.
pub(crate) fn mirror_event(root: &Path, ev: &RecordEvent) {
    let path = root.join(schemas::RECORD_EVENTS_NAME);
    let write = || -> Result<(), error::QualityError> {
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{}", serde_json::to_string(ev)?)?;
        Ok(())
    };
    if let Err(e) = write() {
        tracing::warn!(error = %e, event_id = %ev.event_id, "failed to mirror record event");
    }
}

fn query_records(
    conn: &Connection,
    filter: &RecordFilter,
) -> Result<Vec<MonitoringRecord>, error::QualityError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(c) = optional(&filter.coordinator) {
        values.push(c);
        clauses.push(format!("coordinator = ?{}", values.len()));
    }
    if let Some(a) = optional(&filter.agent_name) {
        values.push(a);
        clauses.push(format!("agent_name = ?{}", values.len()));
    }
    if let Some(s) = filter.status {
        values.push(s.as_str().to_string());
        clauses.push(format!("status = ?{}", values.len()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    // id is AUTOINCREMENT, so descending id is reverse creation order.
    let sql = format!(
        "SELECT {} FROM monitoring_records{} ORDER BY id DESC",
        RECORD_COLUMNS, where_sql
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), RecordRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_record()?);
    }
    Ok(out)
}

pub fn get_record(store: &Store, id: i64) -> Result<MonitoringRecord, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker
        .with_read(&db_path, "qualityguard", "records.get", |conn| load_record(conn, id))?
        .ok_or_else(|| error::QualityError::NotFound(format!("record {}", id)))
}

/// Records newest-created first, optionally filtered.
pub fn list_records(
    store: &Store,
    filter: &RecordFilter,
) -> Result<Vec<MonitoringRecord>, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, "qualityguard", "records.list", |conn| {
        query_records(conn, filter)
    })
}

pub fn count_records(store: &Store) -> Result<i64, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, "qualityguard", "records.count", |conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM monitoring_records", [], |r| r.get(0))?)
    })
}

fn distinct_column(store: &Store, column: &str) -> Result<Vec<String>, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, "qualityguard", "records.distinct", |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {col} FROM monitoring_records
             WHERE {col} IS NOT NULL AND TRIM({col}) != ''
             ORDER BY {col}",
            col = column
        ))?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}

pub fn distinct_coordinators(store: &Store) -> Result<Vec<String>, error::QualityError> {
    distinct_column(store, "coordinator")
}

pub fn distinct_agents(store: &Store) -> Result<Vec<String>, error::QualityError> {
    distinct_column(store, "agent_name")
}

/// Audit events for one record, oldest first.
pub fn list_events(store: &Store, record_id: i64) -> Result<Vec<RecordEvent>, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, "qualityguard", "records.events", |conn| {
        let mut stmt = conn.prepare(
            "SELECT event_id, ts, event_type, record_id, actor, payload
             FROM record_events WHERE record_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![record_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (event_id, ts, event_type, record_id, actor, payload) = row?;
            out.push(RecordEvent {
                event_id,
                ts,
                event_type,
                record_id,
                actor,
                payload: serde_json::from_str(&payload)?,
            });
        }
        Ok(out)
    })
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "records",
        "version": "0.1.0",
        "description": "Monitoring records and their audit events",
        "commands": [
            { "name": "get", "parameters": ["id"] },
            { "name": "list", "parameters": ["coordinator", "agent", "status"] },
            { "name": "events", "parameters": ["id"] }
        ],
        "storage": ["quality.db", "records.events.jsonl"]
    })
}
