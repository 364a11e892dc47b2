use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },
    #[error("Forbidden: role {role} may not {operation}")]
    Forbidden { role: String, operation: String },
    #[error("Invalid state: record {id} is {status}; cannot {operation}")]
    InvalidState {
        id: i64,
        status: String,
        operation: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

impl QualityError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        QualityError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code surfaced across the RPC boundary.
    pub fn code(&self) -> &'static str {
        match self {
            QualityError::Validation { .. } => "validation_error",
            QualityError::Forbidden { .. } => "forbidden",
            QualityError::InvalidState { .. } => "invalid_state",
            QualityError::NotFound(_) => "not_found",
            QualityError::Conflict(_) => "conflict",
            QualityError::InvalidCredentials => "invalid_credentials",
            QualityError::Config(_) => "config_error",
            QualityError::RusqliteError(_)
            | QualityError::IoError(_)
            | QualityError::Json(_)
            | QualityError::PasswordHash(_)
            | QualityError::Corrupt(_) => "internal",
        }
    }

    /// Structured details for the caller (field info, offending role/status).
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            QualityError::Validation { field, message } => {
                Some(serde_json::json!({ "field": field, "message": message }))
            }
            QualityError::Forbidden { role, operation } => {
                Some(serde_json::json!({ "role": role, "operation": operation }))
            }
            QualityError::InvalidState {
                id,
                status,
                operation,
            } => Some(serde_json::json!({
                "id": id,
                "status": status,
                "operation": operation,
            })),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for QualityError {
    fn from(e: toml::de::Error) -> Self {
        QualityError::Config(e.to_string())
    }
}
