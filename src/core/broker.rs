use crate::core::error;
use crate::core::pool;
use crate::core::schemas;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The DB Broker is the "Thin Waist" for state access.
///
/// Every read and every transaction against a store database goes through it, and
/// every access leaves one line in `broker.events.jsonl`.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(schemas::BROKER_EVENTS_NAME),
        }
    }

    /// Run `f` as a single serialized transaction. All-or-nothing.
    pub fn with_tx<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::QualityError>
    where
        F: FnOnce(&Connection) -> Result<R, error::QualityError>,
    {
        let result = pool::global_pool().with_write(db_path, f);
        self.finish(db_path, actor, op_name, result.is_ok());
        result
    }

    /// Run `f` against a fresh read connection.
    pub fn with_read<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::QualityError>
    where
        F: FnOnce(&Connection) -> Result<R, error::QualityError>,
    {
        let result = pool::global_pool().with_read(db_path, f);
        self.finish(db_path, actor, op_name, result.is_ok());
        result
    }

    fn finish(&self, db_path: &Path, actor: &str, op_name: &str, ok: bool) {
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let status = if ok { "success" } else { "error" };
        tracing::debug!(actor, op = op_name, db = %db_id, status, "broker access");
        // Committed state stands even if the audit append fails.
        if let Err(e) = self.log_event(actor, op_name, &db_id, status) {
            tracing::warn!(error = %e, op = op_name, "failed to append broker audit event");
        }
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::QualityError> {
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }

    pub fn audit_log_path(&self) -> &Path {
        &self.audit_log_path
    }
}

/// Read back the broker audit log (oldest first). Missing log means no events yet.
pub fn read_audit_log(root: &Path) -> Result<Vec<BrokerEvent>, error::QualityError> {
    let path = root.join(schemas::BROKER_EVENTS_NAME);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}
