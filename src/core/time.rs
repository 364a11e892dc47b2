//! Shared timestamp/event helpers for envelopes and sign-off dates.

use crate::core::error::QualityError;
use chrono::{NaiveDate, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Calendar dates are stored as `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", Utc::now().timestamp())
}

/// Today's UTC calendar date, `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date, reporting failures against `field`.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, QualityError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| QualityError::validation(field, format!("expected YYYY-MM-DD, got '{}'", value)))
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
