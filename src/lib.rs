//! QualityGuard: a local-first call-quality monitoring tracker.
//!
//! Quality analysts file monitoring records for calls, supervisors sign
//! feedback on them, and agents sign an improvement commitment. Each record
//! moves through a fixed three-state lifecycle gated by the signer's role.
//!
//! # Architecture
//!
//! ## The Thin Waist
//!
//! All state access routes through `DbBroker` for:
//! - Serialization (in-process write lock plus `BEGIN IMMEDIATE`)
//! - All-or-nothing transactions
//! - Audit logging (`broker.events.jsonl`)
//!
//! ## Subsystems (Plugins)
//!
//! - `policy`: role capability table
//! - `users`: credentials and roles
//! - `records`: record storage, filtering, audit events
//! - `lifecycle`: the state machine every mutation goes through
//!
//! # Examples
//!
//! ```bash
//! qualityguard init
//! qualityguard user register --email ana@example.com --password s3cretpass --role QUALITY_ANALYST
//! qualityguard --actor ana@example.com --password s3cretpass record add \
//!     --call-details "Billing dispute" --agent Luis --call-date 2026-10-01 --coordinator Marta \
//!     --end-user-error none --business-critical-error none \
//!     --compliance-error "missing disclosure" --non-critical-error tone
//! qualityguard record list --status PENDING_FEEDBACK
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store, broker, config, logging, migrations, RPC
//! - [`plugins`]: policy, users, records, lifecycle

pub mod cli;
pub mod core;
pub mod plugins;
pub mod subsystems;

use crate::cli::{Cli, Command, ConfigCommand, OutputFormat, RpcCli};
use crate::core::{
    config::{self, QualityConfig},
    error, logging, migration, output,
    rpc::{self, RpcAuth, RpcRequest},
    store::Store,
    time,
};
use crate::plugins::{lifecycle, policy, records, users};

use clap::Parser;
use std::io::Read;
use std::path::Path;

fn emit(format: OutputFormat, out: &serde_json::Value) -> Result<(), error::QualityError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(out)?),
        OutputFormat::Text => println!("{}", output::render_text(out)),
    }
    Ok(())
}

fn resolve_actor(
    store: &Store,
    actor: Option<&str>,
    password: Option<&str>,
) -> Result<Option<users::Actor>, error::QualityError> {
    match (actor, password) {
        (Some(email), Some(pw)) => Ok(Some(users::authenticate(store, email, pw)?)),
        (Some(_), None) => Err(error::QualityError::validation(
            "password",
            "--actor needs --password (or QUALITYGUARD_PASSWORD)",
        )),
        (None, _) => Ok(None),
    }
}

fn run_init(root: &Path, force: bool) -> Result<serde_json::Value, error::QualityError> {
    let store = Store::open(root)?;
    let cfg_path = config::config_path(root);
    let wrote_config = if !cfg_path.exists() || force {
        QualityConfig::default().save(root, true)?;
        true
    } else {
        false
    };
    Ok(time::command_envelope(
        "init",
        "ok",
        serde_json::json!({
            "root": store.root.display().to_string(),
            "schema_version": migration::SCHEMA_VERSION,
            "subsystems": subsystems::subsystem_names(),
            "config_written": wrote_config,
        }),
    ))
}

fn run_rpc(
    store: &Store,
    rpc_cli: RpcCli,
    actor: Option<String>,
    password: Option<String>,
) -> Result<(), error::QualityError> {
    let responses = if rpc_cli.stdin {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        rpc::handle_stream(store, &buffer)
    } else {
        let op = rpc_cli.op.ok_or_else(|| {
            error::QualityError::validation("op", "pass --op or --stdin")
        })?;
        let params = match rpc_cli.params {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| error::QualityError::validation("params", e.to_string()))?,
            None => serde_json::Value::Null,
        };
        let auth = match (actor, password) {
            (Some(email), Some(password)) => Some(RpcAuth { email, password }),
            _ => None,
        };
        vec![rpc::handle_request(
            store,
            RpcRequest {
                op,
                params,
                id: rpc::default_request_id(),
                auth,
            },
        )]
    };
    for response in responses {
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

fn dispatch(cli: Cli, root: &Path, config: QualityConfig) -> Result<(), error::QualityError> {
    let Cli {
        format,
        actor,
        password,
        command,
        ..
    } = cli;

    let out = match command {
        Command::Init { force } => run_init(root, force)?,
        Command::Config(config_cli) => match config_cli.command {
            ConfigCommand::Init { force } => {
                let path = QualityConfig::default().save(root, force)?;
                time::command_envelope(
                    "config.init",
                    "ok",
                    serde_json::json!({ "path": path.display().to_string() }),
                )
            }
            ConfigCommand::Show => serde_json::json!({
                "cmd": "config.show",
                "status": "ok",
                "path": config::config_path(root).display().to_string(),
                "config": config,
            }),
        },
        Command::Policy(policy_cli) => policy::run_policy_cli(policy_cli)?,
        Command::Schema => serde_json::json!({
            "cmd": "schema",
            "status": "ok",
            "subsystems": subsystems::subsystem_names(),
            "schemas": [
                policy::schema(),
                users::schema(),
                records::schema(),
                lifecycle::schema(),
            ],
        }),
        Command::User(user_cli) => {
            let store = Store::open_with_config(root, config)?;
            users::run_user_cli(&store, password.as_deref(), user_cli)?
        }
        Command::Record(record_cli) => {
            let store = Store::open_with_config(root, config)?;
            let actor = resolve_actor(&store, actor.as_deref(), password.as_deref())?;
            lifecycle::run_record_cli(&store, actor.as_ref(), record_cli)?
        }
        Command::Rpc(rpc_cli) => {
            let store = Store::open_with_config(root, config)?;
            return run_rpc(&store, rpc_cli, actor, password);
        }
    };
    emit(format, &out)
}

pub fn run() -> Result<(), error::QualityError> {
    let cli = Cli::parse();
    let root = config::resolve_root(cli.root.as_deref())?;
    let config = QualityConfig::load(&root)?;
    logging::init_logging(&config.log);
    let format = cli.format;

    let result = dispatch(cli, &root, config);
    if let Err(e) = &result
        && format == OutputFormat::Json
    {
        let envelope = serde_json::json!({
            "status": "error",
            "error": { "code": e.code(), "message": e.to_string(), "details": e.details() },
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    result
}
