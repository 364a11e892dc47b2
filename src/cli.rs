//! CLI struct definitions for the QualityGuard command-line interface.
//!
//! All clap-derived types for the top level live here; each plugin owns its own
//! subcommand tree. Dispatch logic lives in `lib.rs`.

use crate::plugins::{lifecycle, policy, users};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "qualityguard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Call-quality monitoring tracker: analysts file records, supervisors sign feedback, agents sign commitments."
)]
pub struct Cli {
    /// Store directory (defaults to $QUALITYGUARD_HOME, then ./.qualityguard).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    /// Email of the acting user.
    #[clap(long, global = true, env = "QUALITYGUARD_ACTOR")]
    pub actor: Option<String>,
    /// Password of the acting (or registering) user.
    #[clap(long, global = true, env = "QUALITYGUARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct ConfigCli {
    #[clap(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default config.toml.
    Init {
        #[clap(long)]
        force: bool,
    },
    /// Print the effective configuration.
    Show,
}

#[derive(clap::Args, Debug)]
pub struct RpcCli {
    /// Operation to perform
    #[clap(long)]
    pub op: Option<String>,
    /// JSON parameters
    #[clap(long)]
    pub params: Option<String>,
    /// Read one request, or one request per line, from stdin
    #[clap(long)]
    pub stdin: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the store, run migrations and write a default config.
    #[clap(name = "init")]
    Init {
        #[clap(long)]
        force: bool,
    },

    /// Inspect or initialize config.toml
    #[clap(name = "config")]
    Config(ConfigCli),

    /// Register and authenticate users
    #[clap(name = "user", visible_alias = "u")]
    User(users::UserCli),

    /// Monitoring records and their lifecycle
    #[clap(name = "record", visible_alias = "r")]
    Record(lifecycle::RecordCli),

    /// Role capability table
    #[clap(name = "policy")]
    Policy(policy::PolicyCli),

    /// Subsystem schemas
    #[clap(name = "schema")]
    Schema,

    /// Structured JSON-RPC interface
    #[clap(name = "rpc")]
    Rpc(RpcCli),
}
