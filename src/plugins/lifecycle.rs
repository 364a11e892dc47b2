//! Record lifecycle engine.
//!
//! ```text
//! PENDING_FEEDBACK --submit_feedback--> PENDING_COMMITMENT --submit_commitment--> COMPLETED
//! PENDING_FEEDBACK --delete--> (removed)
//! PENDING_FEEDBACK --update--> PENDING_FEEDBACK
//! ```
//!
//! Every mutation is one broker transaction: load, check preconditions, guarded
//! write, audit event. A rejected call leaves the store untouched.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::logging;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::policy::{self, Operation, Role};
use crate::plugins::records::{
    self, MonitoringRecord, NewRecord, RecordEvent, RecordFilter, RecordPatch, RecordStatus,
    SignOff,
};
use crate::plugins::users::Actor;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

#[derive(Parser, Debug)]
#[clap(name = "record", about = "Create, sign off and inspect monitoring records")]
pub struct RecordCli {
    #[clap(subcommand)]
    pub command: RecordCommand,
}

#[derive(Args, Debug, Default)]
pub struct RecordFields {
    #[clap(long)]
    pub call_details: Option<String>,
    #[clap(long = "agent")]
    pub agent_name: Option<String>,
    /// YYYY-MM-DD
    #[clap(long)]
    pub call_date: Option<String>,
    #[clap(long)]
    pub coordinator: Option<String>,
    #[clap(long)]
    pub monitoring_id: Option<String>,
    #[clap(long)]
    pub service_level: Option<String>,
    #[clap(long)]
    pub attachment_name: Option<String>,
    /// Encoded attachment payload (e.g. a base64 data URL).
    #[clap(long)]
    pub attachment_data: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// File a new record (QUALITY_ANALYST).
    Add {
        #[clap(flatten)]
        fields: RecordFields,
        #[clap(long)]
        end_user_error: String,
        #[clap(long)]
        business_critical_error: String,
        #[clap(long)]
        compliance_error: String,
        #[clap(long)]
        non_critical_error: String,
    },
    /// Edit a PENDING_FEEDBACK record (QUALITY_ANALYST).
    Edit {
        id: i64,
        #[clap(flatten)]
        fields: RecordFields,
    },
    /// Delete a PENDING_FEEDBACK record.
    Delete { id: i64 },
    /// Sign supervisor feedback (SUPERVISOR).
    Feedback {
        id: i64,
        #[clap(long)]
        text: String,
    },
    /// Sign an improvement commitment (AGENT).
    Commit {
        id: i64,
        #[clap(long)]
        text: String,
    },
    Get { id: i64 },
    /// List records, newest first.
    List {
        #[clap(long)]
        coordinator: Option<String>,
        #[clap(long = "agent")]
        agent_name: Option<String>,
        #[clap(long, value_enum)]
        status: Option<RecordStatus>,
    },
    /// Show the audit events for a record.
    Events { id: i64 },
    /// Known coordinators and agents, for filtering.
    Facets,
}

/// Operations the state machine still permits on a record in `status`.
pub fn next_operations(status: RecordStatus) -> Vec<Operation> {
    match status {
        RecordStatus::PendingFeedback => vec![
            Operation::Update,
            Operation::Delete,
            Operation::SubmitFeedback,
            Operation::List,
        ],
        RecordStatus::PendingCommitment => vec![Operation::SubmitCommitment, Operation::List],
        RecordStatus::Completed => vec![Operation::List],
    }
}

fn invalid_state(rec: &MonitoringRecord, op: Operation) -> error::QualityError {
    error::QualityError::InvalidState {
        id: rec.id,
        status: rec.status.to_string(),
        operation: op.to_string(),
    }
}

fn require_record(conn: &Connection, id: i64) -> Result<MonitoringRecord, error::QualityError> {
    records::load_record(conn, id)?
        .ok_or_else(|| error::QualityError::NotFound(format!("record {}", id)))
}

fn authorize(actor: &Actor, op: Operation) -> Result<(), error::QualityError> {
    policy::authorize(actor.role, op).inspect_err(|_| {
        tracing::warn!(actor = %actor.email, role = %actor.role, operation = %op, "operation forbidden");
    })
}

/// After a guarded write touched no rows, report against the record's current state.
fn lost_race(
    conn: &Connection,
    id: i64,
    op: Operation,
) -> Result<error::QualityError, error::QualityError> {
    let current = require_record(conn, id)?;
    Ok(invalid_state(&current, op))
}

fn sign_text(field: &str, text: &str) -> Result<String, error::QualityError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(error::QualityError::validation(
            field,
            format!("{} must not be empty", field),
        ));
    }
    Ok(text.to_string())
}

fn commit_tx<F>(
    store: &Store,
    actor: &Actor,
    op_name: &str,
    f: F,
) -> Result<(MonitoringRecord, RecordEvent), error::QualityError>
where
    F: FnOnce(&Connection) -> Result<(MonitoringRecord, RecordEvent), error::QualityError>,
{
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    let (record, event) = broker.with_tx(&db_path, &actor.email, op_name, |conn| {
        let (record, event) = f(conn)?;
        records::insert_event(conn, &event)?;
        Ok((record, event))
    })?;
    records::mirror_event(&store.root, &event);
    Ok((record, event))
}

pub fn create(
    store: &Store,
    actor: &Actor,
    new: &NewRecord,
) -> Result<MonitoringRecord, error::QualityError> {
    let span = logging::operation_span("create", &actor.email, None);
    let _guard = span.enter();

    authorize(actor, Operation::Create)?;
    let valid = new.validate(&store.config.records.default_service_level)?;
    let registration_date = time::today();

    let (record, _) = commit_tx(store, actor, "records.create", |conn| {
        let id = records::insert_record(conn, &valid, &actor.email, &registration_date)?;
        let record = require_record(conn, id)?;
        let event = RecordEvent::new(
            "record.created",
            id,
            &actor.email,
            serde_json::json!({
                "agent_name": record.agent_name,
                "call_date": record.call_date,
                "coordinator": record.coordinator,
            }),
        );
        Ok((record, event))
    })?;

    tracing::info!(record.id = record.id, status = %record.status, "record created");
    Ok(record)
}

pub fn update(
    store: &Store,
    actor: &Actor,
    id: i64,
    patch: &RecordPatch,
) -> Result<MonitoringRecord, error::QualityError> {
    let span = logging::operation_span("update", &actor.email, Some(id));
    let _guard = span.enter();

    let (record, event) = commit_tx(store, actor, "records.update", |conn| {
        let current = require_record(conn, id)?;
        if current.status != RecordStatus::PendingFeedback {
            return Err(invalid_state(&current, Operation::Update));
        }
        authorize(actor, Operation::Update)?;
        let assignments = patch.assignments(&store.config.records.default_service_level)?;
        if records::update_fields(conn, id, &assignments)? == 0 {
            return Err(lost_race(conn, id, Operation::Update)?);
        }
        let changed: Vec<&str> = assignments.iter().map(|(c, _)| *c).collect();
        let event = RecordEvent::new(
            "record.updated",
            id,
            &actor.email,
            serde_json::json!({ "fields": changed }),
        );
        Ok((require_record(conn, id)?, event))
    })?;

    tracing::info!(record.id = id, fields = %event.payload["fields"], "record updated");
    Ok(record)
}

/// Remove a PENDING_FEEDBACK record. Returns the record as it was before removal.
pub fn delete(
    store: &Store,
    actor: &Actor,
    id: i64,
) -> Result<MonitoringRecord, error::QualityError> {
    let span = logging::operation_span("delete", &actor.email, Some(id));
    let _guard = span.enter();
    let restrict = store.config.records.restrict_delete_to_analyst;

    let (record, _) = commit_tx(store, actor, "records.delete", |conn| {
        let current = require_record(conn, id)?;
        if current.status != RecordStatus::PendingFeedback {
            return Err(invalid_state(&current, Operation::Delete));
        }
        if restrict {
            authorize(actor, Operation::Delete)?;
        } else if actor.role != Role::QualityAnalyst {
            tracing::warn!(
                actor = %actor.email,
                role = %actor.role,
                "record deleted by a role without delete capability"
            );
        }
        if records::delete_row(conn, id)? == 0 {
            return Err(lost_race(conn, id, Operation::Delete)?);
        }
        let event = RecordEvent::new(
            "record.deleted",
            id,
            &actor.email,
            serde_json::json!({ "role": actor.role, "snapshot": current }),
        );
        Ok((current, event))
    })?;

    tracing::info!(record.id = id, "record deleted");
    Ok(record)
}

pub fn submit_feedback(
    store: &Store,
    actor: &Actor,
    id: i64,
    text: &str,
) -> Result<MonitoringRecord, error::QualityError> {
    let span = logging::operation_span("submit_feedback", &actor.email, Some(id));
    let _guard = span.enter();

    authorize(actor, Operation::SubmitFeedback)?;
    let text = sign_text("supervisor_feedback", text)?;

    let (record, _) = commit_tx(store, actor, "records.feedback", |conn| {
        let current = require_record(conn, id)?;
        if current.status != RecordStatus::PendingFeedback || current.feedback.is_some() {
            return Err(invalid_state(&current, Operation::SubmitFeedback));
        }
        let sign = SignOff {
            text,
            date: time::today(),
            signature: actor.email.clone(),
        };
        if records::set_feedback(conn, id, &sign)? == 0 {
            return Err(lost_race(conn, id, Operation::SubmitFeedback)?);
        }
        let event = RecordEvent::new(
            "record.feedback",
            id,
            &actor.email,
            serde_json::json!({ "date": sign.date, "signature": sign.signature }),
        );
        Ok((require_record(conn, id)?, event))
    })?;

    tracing::info!(record.id = id, status = %record.status, "feedback signed");
    Ok(record)
}

pub fn submit_commitment(
    store: &Store,
    actor: &Actor,
    id: i64,
    text: &str,
) -> Result<MonitoringRecord, error::QualityError> {
    let span = logging::operation_span("submit_commitment", &actor.email, Some(id));
    let _guard = span.enter();

    authorize(actor, Operation::SubmitCommitment)?;
    let text = sign_text("agent_commitment", text)?;

    let (record, _) = commit_tx(store, actor, "records.commitment", |conn| {
        let current = require_record(conn, id)?;
        if current.status != RecordStatus::PendingCommitment || current.commitment.is_some() {
            return Err(invalid_state(&current, Operation::SubmitCommitment));
        }
        let sign = SignOff {
            text,
            date: time::today(),
            signature: actor.email.clone(),
        };
        if records::set_commitment(conn, id, &sign)? == 0 {
            return Err(lost_race(conn, id, Operation::SubmitCommitment)?);
        }
        let event = RecordEvent::new(
            "record.commitment",
            id,
            &actor.email,
            serde_json::json!({ "date": sign.date, "signature": sign.signature }),
        );
        Ok((require_record(conn, id)?, event))
    })?;

    tracing::info!(record.id = id, status = %record.status, "commitment signed");
    Ok(record)
}

/// Every role may list. Newest-created first.
pub fn list(
    store: &Store,
    filter: &RecordFilter,
) -> Result<Vec<MonitoringRecord>, error::QualityError> {
    records::list_records(store, filter)
}

fn require_actor(actor: Option<&Actor>) -> Result<&Actor, error::QualityError> {
    actor.ok_or_else(|| {
        error::QualityError::validation(
            "actor",
            "this command needs --actor and --password (or QUALITYGUARD_ACTOR / QUALITYGUARD_PASSWORD)",
        )
    })
}

fn record_json(cmd: &str, record: &MonitoringRecord) -> serde_json::Value {
    serde_json::json!({
        "cmd": cmd,
        "status": "ok",
        "record": record,
        "allowed_next_ops": next_operations(record.status),
    })
}

pub fn run_record_cli(
    store: &Store,
    actor: Option<&Actor>,
    cli: RecordCli,
) -> Result<serde_json::Value, error::QualityError> {
    let out = match cli.command {
        RecordCommand::Add {
            fields,
            end_user_error,
            business_critical_error,
            compliance_error,
            non_critical_error,
        } => {
            let actor = require_actor(actor)?;
            let new = NewRecord {
                call_details: fields.call_details.unwrap_or_default(),
                agent_name: fields.agent_name.unwrap_or_default(),
                call_date: fields.call_date.unwrap_or_default(),
                coordinator: fields.coordinator.unwrap_or_default(),
                monitoring_id: fields.monitoring_id,
                service_level: fields.service_level,
                attachment_name: fields.attachment_name,
                attachment_data: fields.attachment_data,
                end_user_error,
                business_critical_error,
                compliance_error,
                non_critical_error,
            };
            record_json("record.add", &create(store, actor, &new)?)
        }
        RecordCommand::Edit { id, fields } => {
            let actor = require_actor(actor)?;
            let patch = RecordPatch {
                call_details: fields.call_details,
                agent_name: fields.agent_name,
                call_date: fields.call_date,
                coordinator: fields.coordinator,
                monitoring_id: fields.monitoring_id,
                service_level: fields.service_level,
                attachment_name: fields.attachment_name,
                attachment_data: fields.attachment_data,
            };
            record_json("record.edit", &update(store, actor, id, &patch)?)
        }
        RecordCommand::Delete { id } => {
            let actor = require_actor(actor)?;
            let removed = delete(store, actor, id)?;
            serde_json::json!({ "cmd": "record.delete", "status": "ok", "deleted": removed.id })
        }
        RecordCommand::Feedback { id, text } => {
            let actor = require_actor(actor)?;
            record_json("record.feedback", &submit_feedback(store, actor, id, &text)?)
        }
        RecordCommand::Commit { id, text } => {
            let actor = require_actor(actor)?;
            record_json("record.commit", &submit_commitment(store, actor, id, &text)?)
        }
        RecordCommand::Get { id } => record_json("record.get", &records::get_record(store, id)?),
        RecordCommand::List {
            coordinator,
            agent_name,
            status,
        } => {
            let filter = RecordFilter {
                coordinator,
                agent_name,
                status,
            };
            let records = list(store, &filter)?;
            serde_json::json!({
                "cmd": "record.list",
                "status": "ok",
                "count": records.len(),
                "records": records,
            })
        }
        RecordCommand::Events { id } => {
            let events = records::list_events(store, id)?;
            serde_json::json!({ "cmd": "record.events", "status": "ok", "events": events })
        }
        RecordCommand::Facets => serde_json::json!({
            "cmd": "record.facets",
            "status": "ok",
            "coordinators": records::distinct_coordinators(store)?,
            "agents": records::distinct_agents(store)?,
        }),
    };
    Ok(out)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "lifecycle",
        "version": "0.1.0",
        "description": "Role-gated record state machine",
        "states": ["PENDING_FEEDBACK", "PENDING_COMMITMENT", "COMPLETED"],
        "commands": [
            { "name": "add", "parameters": ["call_details", "agent", "call_date", "coordinator", "monitoring_id", "service_level", "attachment_name", "attachment_data", "end_user_error", "business_critical_error", "compliance_error", "non_critical_error"] },
            { "name": "edit", "parameters": ["id", "call_details", "agent", "call_date", "coordinator", "monitoring_id", "service_level", "attachment_name", "attachment_data"] },
            { "name": "delete", "parameters": ["id"] },
            { "name": "feedback", "parameters": ["id", "text"] },
            { "name": "commit", "parameters": ["id", "text"] },
            { "name": "list", "parameters": ["coordinator", "agent", "status"] }
        ],
        "storage": ["quality.db", "records.events.jsonl"]
    })
}
