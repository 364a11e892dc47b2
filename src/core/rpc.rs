//! QualityGuard RPC interface
//!
//! JSON request/response envelopes over stdin/stdout. This is the boundary the
//! web/API layer talks to.
//!
//! # Standard Response Envelope
//!
//! Every RPC response returns:
//! - `receipt`: operation, timestamp, input and output hashes
//! - `result`: operation payload on success
//! - `allowed_next_ops`: what the record's state (or the caller's role) permits next
//! - `error`: stable code, message and structured details on failure

use crate::core::error::QualityError;
use crate::core::store::Store;
use crate::plugins::lifecycle;
use crate::plugins::policy::{self, Operation, Role};
use crate::plugins::records::{self, MonitoringRecord, NewRecord, RecordFilter, RecordPatch};
use crate::plugins::users::{self, Actor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Digest;

/// Standard RPC request envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    /// Operation to perform
    pub op: String,
    /// Operation parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Request ID for correlation
    #[serde(default = "default_request_id")]
    pub id: String,
    /// Credentials for mutating operations. The role is looked up, never supplied.
    #[serde(default)]
    pub auth: Option<RpcAuth>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcAuth {
    pub email: String,
    pub password: String,
}

pub fn default_request_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Standard RPC response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    pub id: String,
    pub success: bool,
    pub receipt: Receipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub allowed_next_ops: Vec<AllowedOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Receipt documenting what happened
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Receipt {
    pub op: String,
    pub timestamp: String,
    /// SHA-256 of the params, with passwords redacted
    pub inputs_hash: String,
    /// SHA-256 of the result
    pub outputs_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AllowedOp {
    pub op: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required_params: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegisterParams {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginParams {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdParams {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateParams {
    id: i64,
    fields: RecordPatch,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignParams {
    id: i64,
    text: String,
}

/// RPC op name for a lifecycle operation.
pub fn op_name(op: Operation) -> &'static str {
    match op {
        Operation::Create => "records.create",
        Operation::Update => "records.update",
        Operation::Delete => "records.delete",
        Operation::SubmitFeedback => "records.feedback",
        Operation::SubmitCommitment => "records.commitment",
        Operation::List => "records.list",
    }
}

fn required_params(op: Operation) -> Vec<String> {
    let names: &[&str] = match op {
        Operation::Create => &[
            "call_details",
            "agent_name",
            "call_date",
            "coordinator",
            "end_user_error",
            "business_critical_error",
            "compliance_error",
            "non_critical_error",
        ],
        Operation::Update => &["id", "fields"],
        Operation::Delete => &["id"],
        Operation::SubmitFeedback | Operation::SubmitCommitment => &["id", "text"],
        Operation::List => &[],
    };
    names.iter().map(|s| s.to_string()).collect()
}

fn allowed(op: Operation, reason: &str) -> AllowedOp {
    AllowedOp {
        op: op_name(op).to_string(),
        reason: reason.to_string(),
        required_params: required_params(op),
    }
}

/// Next steps for a record, as seen by the state machine.
fn record_next_ops(record: &MonitoringRecord) -> Vec<AllowedOp> {
    let reason = format!("record {} is {}", record.id, record.status);
    lifecycle::next_operations(record.status)
        .into_iter()
        .map(|op| allowed(op, &reason))
        .collect()
}

/// Next steps for an actor, as seen by the capability table.
fn role_next_ops(role: Role) -> Vec<AllowedOp> {
    let reason = format!("role {} may perform this", role);
    policy::capabilities(role)
        .into_iter()
        .map(|op| allowed(op, &reason))
        .collect()
}

fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, QualityError> {
    let value = if params.is_null() {
        serde_json::json!({})
    } else {
        params.clone()
    };
    serde_json::from_value(value).map_err(|e| QualityError::validation("params", e.to_string()))
}

fn require_auth(store: &Store, auth: Option<&RpcAuth>) -> Result<Actor, QualityError> {
    match auth {
        Some(a) => users::authenticate(store, &a.email, &a.password),
        None => Err(QualityError::InvalidCredentials),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, QualityError> {
    Ok(serde_json::to_value(value)?)
}

fn dispatch(
    store: &Store,
    op: &str,
    params: &serde_json::Value,
    auth: Option<&RpcAuth>,
) -> Result<(serde_json::Value, Vec<AllowedOp>), QualityError> {
    match op {
        "auth.register" => {
            let p: RegisterParams = parse_params(params)?;
            let user = users::register(store, &p.email, &p.password, p.role)?;
            let next = vec![AllowedOp {
                op: "auth.login".to_string(),
                reason: "user registered".to_string(),
                required_params: vec!["email".to_string(), "password".to_string()],
            }];
            Ok((to_json(&user)?, next))
        }
        "auth.login" => {
            let p: LoginParams = parse_params(params)?;
            let actor = users::authenticate(store, &p.email, &p.password)?;
            let next = role_next_ops(actor.role);
            Ok((to_json(&actor)?, next))
        }
        "records.list" => {
            let filter: RecordFilter = parse_params(params)?;
            let records = lifecycle::list(store, &filter)?;
            let next = vec![AllowedOp {
                op: "records.get".to_string(),
                reason: "inspect one record".to_string(),
                required_params: vec!["id".to_string()],
            }];
            Ok((
                serde_json::json!({ "count": records.len(), "records": records }),
                next,
            ))
        }
        "records.get" => {
            let p: IdParams = parse_params(params)?;
            let record = records::get_record(store, p.id)?;
            let next = record_next_ops(&record);
            Ok((to_json(&record)?, next))
        }
        "records.events" => {
            let p: IdParams = parse_params(params)?;
            let events = records::list_events(store, p.id)?;
            Ok((serde_json::json!({ "events": events }), vec![]))
        }
        "records.facets" => Ok((
            serde_json::json!({
                "coordinators": records::distinct_coordinators(store)?,
                "agents": records::distinct_agents(store)?,
            }),
            vec![],
        )),
        "records.create" => {
            let actor = require_auth(store, auth)?;
            // Role first: a non-analyst gets Forbidden whatever the payload.
            policy::authorize(actor.role, Operation::Create)?;
            let new: NewRecord = parse_params(params)?;
            let record = lifecycle::create(store, &actor, &new)?;
            let next = record_next_ops(&record);
            Ok((to_json(&record)?, next))
        }
        "records.update" => {
            let actor = require_auth(store, auth)?;
            let p: UpdateParams = parse_params(params)?;
            let record = lifecycle::update(store, &actor, p.id, &p.fields)?;
            let next = record_next_ops(&record);
            Ok((to_json(&record)?, next))
        }
        "records.delete" => {
            let actor = require_auth(store, auth)?;
            let p: IdParams = parse_params(params)?;
            let removed = lifecycle::delete(store, &actor, p.id)?;
            Ok((serde_json::json!({ "deleted": removed.id }), vec![]))
        }
        "records.feedback" => {
            let actor = require_auth(store, auth)?;
            let p: SignParams = parse_params(params)?;
            let record = lifecycle::submit_feedback(store, &actor, p.id, &p.text)?;
            let next = record_next_ops(&record);
            Ok((to_json(&record)?, next))
        }
        "records.commitment" => {
            let actor = require_auth(store, auth)?;
            let p: SignParams = parse_params(params)?;
            let record = lifecycle::submit_commitment(store, &actor, p.id, &p.text)?;
            let next = record_next_ops(&record);
            Ok((to_json(&record)?, next))
        }
        other => Err(QualityError::validation(
            "op",
            format!("unknown operation '{}'", other),
        )),
    }
}

/// Never hash a password, even into a receipt.
fn redact(params: &serde_json::Value) -> serde_json::Value {
    match params {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if k == "password" {
                        (k.clone(), serde_json::Value::String("***".to_string()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sha256_hex(value: &impl Serialize) -> String {
    format!(
        "{:x}",
        sha2::Sha256::digest(serde_json::to_string(value).unwrap_or_default())
    )
}

pub fn success_response(
    request_id: String,
    op: String,
    params: &serde_json::Value,
    result: serde_json::Value,
    allowed_next_ops: Vec<AllowedOp>,
) -> RpcResponse {
    RpcResponse {
        id: request_id,
        success: true,
        receipt: Receipt {
            op,
            timestamp: crate::core::time::now_epoch_z(),
            inputs_hash: sha256_hex(&redact(params)),
            outputs_hash: sha256_hex(&result),
        },
        result: Some(result),
        allowed_next_ops,
        error: None,
    }
}

pub fn error_response(
    request_id: String,
    op: String,
    params: &serde_json::Value,
    err: &QualityError,
) -> RpcResponse {
    RpcResponse {
        id: request_id,
        success: false,
        receipt: Receipt {
            op,
            timestamp: crate::core::time::now_epoch_z(),
            inputs_hash: sha256_hex(&redact(params)),
            outputs_hash: format!("{:x}", sha2::Sha256::digest("error")),
        },
        result: None,
        allowed_next_ops: vec![],
        error: Some(RpcError {
            code: err.code().to_string(),
            message: err.to_string(),
            details: err.details(),
        }),
    }
}

/// Execute one request. Failures become error envelopes, never panics or process exits.
pub fn handle_request(store: &Store, req: RpcRequest) -> RpcResponse {
    let RpcRequest {
        op,
        params,
        id,
        auth,
    } = req;
    match dispatch(store, &op, &params, auth.as_ref()) {
        Ok((result, next)) => success_response(id, op, &params, result, next),
        Err(e) => {
            tracing::debug!(op = %op, code = e.code(), error = %e, "rpc request failed");
            error_response(id, op, &params, &e)
        }
    }
}

/// Parse stdin: one JSON request, or one request per line.
pub fn parse_requests(input: &str) -> Vec<Result<RpcRequest, QualityError>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return vec![];
    }
    if let Ok(single) = serde_json::from_str::<RpcRequest>(trimmed) {
        return vec![Ok(single)];
    }
    trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str::<RpcRequest>(l)
                .map_err(|e| QualityError::validation("request", e.to_string()))
        })
        .collect()
}

/// Handle every request in `input`, in order.
pub fn handle_stream(store: &Store, input: &str) -> Vec<RpcResponse> {
    parse_requests(input)
        .into_iter()
        .map(|parsed| match parsed {
            Ok(req) => handle_request(store, req),
            Err(e) => error_response(
                default_request_id(),
                "unknown".to_string(),
                &serde_json::Value::Null,
                &e,
            ),
        })
        .collect()
}
