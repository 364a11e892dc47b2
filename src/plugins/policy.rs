use crate::core::error;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[clap(name = "policy", about = "Inspect the role capability table")]
pub struct PolicyCli {
    #[clap(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Show which operations each role may perform.
    Show {
        /// Restrict output to one role.
        #[clap(long, value_enum)]
        role: Option<Role>,
    },
    /// Check a single (role, operation) pair.
    Check {
        #[clap(long, value_enum)]
        role: Role,
        #[clap(long, value_enum)]
        operation: Operation,
    },
}

/// The single capability tag carried by every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Agent,
    Supervisor,
    QualityAnalyst,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Agent, Role::Supervisor, Role::QualityAnalyst];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "AGENT",
            Role::Supervisor => "SUPERVISOR",
            Role::QualityAnalyst => "QUALITY_ANALYST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = error::QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AGENT" => Ok(Role::Agent),
            "SUPERVISOR" => Ok(Role::Supervisor),
            "QUALITY_ANALYST" => Ok(Role::QualityAnalyst),
            other => Err(error::QualityError::validation(
                "role",
                format!(
                    "unknown role '{}' (expected AGENT, SUPERVISOR or QUALITY_ANALYST)",
                    other
                ),
            )),
        }
    }
}

/// Operations the lifecycle exposes to actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    SubmitFeedback,
    SubmitCommitment,
    List,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Update,
        Operation::Delete,
        Operation::SubmitFeedback,
        Operation::SubmitCommitment,
        Operation::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::SubmitFeedback => "submit_feedback",
            Operation::SubmitCommitment => "submit_commitment",
            Operation::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability table. Pure: never looks at record content.
pub fn is_allowed(role: Role, op: Operation) -> bool {
    match op {
        Operation::List => true,
        Operation::Create | Operation::Update | Operation::Delete => role == Role::QualityAnalyst,
        Operation::SubmitFeedback => role == Role::Supervisor,
        Operation::SubmitCommitment => role == Role::Agent,
    }
}

pub fn authorize(role: Role, op: Operation) -> Result<(), error::QualityError> {
    if is_allowed(role, op) {
        Ok(())
    } else {
        Err(error::QualityError::Forbidden {
            role: role.to_string(),
            operation: op.to_string(),
        })
    }
}

pub fn capabilities(role: Role) -> Vec<Operation> {
    Operation::ALL
        .into_iter()
        .filter(|op| is_allowed(role, *op))
        .collect()
}

pub fn run_policy_cli(cli: PolicyCli) -> Result<serde_json::Value, error::QualityError> {
    let out = match cli.command {
        PolicyCommand::Show { role } => {
            let roles: Vec<Role> = match role {
                Some(r) => vec![r],
                None => Role::ALL.to_vec(),
            };
            let table: Vec<serde_json::Value> = roles
                .into_iter()
                .map(|r| {
                    serde_json::json!({
                        "role": r,
                        "operations": capabilities(r),
                    })
                })
                .collect();
            serde_json::json!({ "cmd": "policy.show", "status": "ok", "roles": table })
        }
        PolicyCommand::Check { role, operation } => serde_json::json!({
            "cmd": "policy.check",
            "status": "ok",
            "role": role,
            "operation": operation,
            "allowed": is_allowed(role, operation),
        }),
    };
    Ok(out)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "policy",
        "version": "0.1.0",
        "description": "Role capability table for record operations",
        "commands": [
            { "name": "show", "parameters": ["role"] },
            { "name": "check", "parameters": ["role", "operation"] }
        ],
        "storage": []
    })
}
