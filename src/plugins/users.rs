use crate::core::broker::DbBroker;
use crate::core::config::PasswordConfig;
use crate::core::db;
use crate::core::error;
use crate::core::migration;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::policy::Role;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use clap::{Parser, Subcommand};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Hashes verified when the email is unknown, one per parameter set, so both
/// login failures cost the same.
static DUMMY_HASHES: LazyLock<Mutex<HashMap<(u32, u32, u32), String>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Parser, Debug)]
#[clap(name = "user", about = "Register and authenticate QualityGuard users")]
pub struct UserCli {
    #[clap(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user.
    ///
    /// The password comes from the global `--password` / `QUALITYGUARD_PASSWORD`.
    Register {
        #[clap(long)]
        email: String,
        /// Defaults to AGENT.
        #[clap(long, value_enum)]
        role: Option<Role>,
    },
    /// Check credentials and print the resolved role.
    Login {
        #[clap(long)]
        email: String,
    },
    /// List registered users.
    List,
    /// Show one user.
    Get {
        #[clap(long)]
        email: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub role: Role,
    pub created_at: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// An authenticated identity. The role always comes from the user store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            email: user.email.clone(),
            role: user.role,
        }
    }
}

pub fn initialize_users_db(root: &Path) -> Result<(), error::QualityError> {
    let broker = DbBroker::new(root);
    let db_path = db::quality_db_path(root);
    broker.with_tx(&db_path, "qualityguard", "users.init", |conn| {
        let applied = migration::ensure_schema(conn)?;
        if !applied.is_empty() {
            tracing::info!(versions = ?applied, "schema migrated");
        }
        Ok(())
    })
}

/// Trim, lowercase and shape-check an email address.
pub fn normalize_email(raw: &str) -> Result<String, error::QualityError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(error::QualityError::validation("email", "email is required"));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(error::QualityError::validation(
            "email",
            format!("'{}' is not a valid email address", email),
        ));
    }
    Ok(email)
}

fn hasher(cfg: &PasswordConfig) -> Result<Argon2<'static>, error::QualityError> {
    let params = Params::new(
        cfg.argon2_memory_kib,
        cfg.argon2_iterations,
        cfg.argon2_parallelism,
        None,
    )
    .map_err(|e| error::QualityError::PasswordHash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str, cfg: &PasswordConfig) -> Result<String, error::QualityError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(cfg)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| error::QualityError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// A hash with the configured parameters, built on first use.
fn dummy_hash(cfg: &PasswordConfig) -> Result<String, error::QualityError> {
    let key = (
        cfg.argon2_memory_kib,
        cfg.argon2_iterations,
        cfg.argon2_parallelism,
    );
    let mut cache = DUMMY_HASHES
        .lock()
        .map_err(|_| error::QualityError::PasswordHash("dummy hash cache poisoned".into()))?;
    if let Some(hash) = cache.get(&key) {
        return Ok(hash.clone());
    }
    let hash = hash_password("qualityguard-dummy-password", cfg)?;
    cache.insert(key, hash.clone());
    Ok(hash)
}

/// Verification reads its parameters from the PHC string itself.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_user(
    (email, password_hash, role, created_at): (String, String, String, String),
) -> Result<User, error::QualityError> {
    let role = role.parse::<Role>().map_err(|_| {
        error::QualityError::Corrupt(format!("user '{}' has unknown role '{}'", email, role))
    })?;
    Ok(User {
        email,
        role,
        created_at,
        password_hash,
    })
}

fn load_user(conn: &Connection, email: &str) -> Result<Option<User>, error::QualityError> {
    let row = conn
        .query_row(
            "SELECT email, password_hash, role, created_at FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        )
        .optional()?;
    row.map(into_user).transpose()
}

pub fn register(
    store: &Store,
    email: &str,
    password: &str,
    role: Option<Role>,
) -> Result<User, error::QualityError> {
    let email = normalize_email(email)?;
    let cfg = &store.config.password;
    if password.chars().count() < cfg.min_length {
        return Err(error::QualityError::validation(
            "password",
            format!("password must be at least {} characters", cfg.min_length),
        ));
    }
    let role = role.unwrap_or(Role::Agent);
    // Hash outside the write lock.
    let password_hash = hash_password(password, cfg)?;

    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    let user = broker.with_tx(&db_path, &email, "users.register", |conn| {
        if load_user(conn, &email)?.is_some() {
            return Err(error::QualityError::Conflict(format!(
                "user '{}' already exists",
                email
            )));
        }
        let created_at = time::now_epoch_z();
        conn.execute(
            "INSERT INTO users(email, password_hash, role, created_at) VALUES(?1, ?2, ?3, ?4)",
            params![email, password_hash, role.as_str(), created_at],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                error::QualityError::Conflict(format!("user '{}' already exists", email))
            }
            _ => error::QualityError::from(e),
        })?;
        Ok(User {
            email: email.clone(),
            role,
            created_at,
            password_hash: password_hash.clone(),
        })
    })?;

    tracing::info!(email = %user.email, role = %user.role, "user registered");
    Ok(user)
}

/// Resolve credentials to an actor. Unknown email and wrong password are indistinguishable.
pub fn authenticate(
    store: &Store,
    email: &str,
    password: &str,
) -> Result<Actor, error::QualityError> {
    let email = email.trim().to_lowercase();
    let user = get_user(store, &email)?;
    match user {
        Some(user) if verify_password(password, &user.password_hash) => {
            tracing::debug!(email = %user.email, role = %user.role, "login ok");
            Ok(Actor::from(&user))
        }
        Some(_) => {
            tracing::warn!(email = %email, "login rejected");
            Err(error::QualityError::InvalidCredentials)
        }
        None => {
            let dummy = dummy_hash(&store.config.password)?;
            let _ = verify_password(password, &dummy);
            tracing::warn!(email = %email, "login rejected");
            Err(error::QualityError::InvalidCredentials)
        }
    }
}

pub fn get_user(store: &Store, email: &str) -> Result<Option<User>, error::QualityError> {
    let email = email.trim().to_lowercase();
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, &email, "users.get", |conn| load_user(conn, &email))
}

pub fn list_users(store: &Store) -> Result<Vec<User>, error::QualityError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::quality_db_path(&store.root);
    broker.with_read(&db_path, "qualityguard", "users.list", |conn| {
        let mut stmt =
            conn.prepare("SELECT email, password_hash, role, created_at FROM users ORDER BY email")?;
        let rows = stmt.query_map([], row_to_user)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(into_user(row?)?);
        }
        Ok(out)
    })
}

fn require_password(password: Option<&str>) -> Result<&str, error::QualityError> {
    password.ok_or_else(|| {
        error::QualityError::validation(
            "password",
            "pass --password or set QUALITYGUARD_PASSWORD",
        )
    })
}

pub fn run_user_cli(
    store: &Store,
    password: Option<&str>,
    cli: UserCli,
) -> Result<serde_json::Value, error::QualityError> {
    let out = match cli.command {
        UserCommand::Register { email, role } => {
            let user = register(store, &email, require_password(password)?, role)?;
            serde_json::json!({ "cmd": "user.register", "status": "ok", "user": user })
        }
        UserCommand::Login { email } => {
            let actor = authenticate(store, &email, require_password(password)?)?;
            serde_json::json!({ "cmd": "user.login", "status": "ok", "actor": actor })
        }
        UserCommand::List => {
            let users = list_users(store)?;
            serde_json::json!({ "cmd": "user.list", "status": "ok", "users": users })
        }
        UserCommand::Get { email } => {
            let user = get_user(store, &email)?
                .ok_or_else(|| error::QualityError::NotFound(format!("user '{}'", email.trim())))?;
            serde_json::json!({ "cmd": "user.get", "status": "ok", "user": user })
        }
    };
    Ok(out)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "users",
        "version": "0.1.0",
        "description": "Credential and role records",
        "commands": [
            { "name": "register", "parameters": ["email", "password", "role"] },
            { "name": "login", "parameters": ["email", "password"] },
            { "name": "list", "parameters": [] },
            { "name": "get", "parameters": ["email"] }
        ],
        "storage": ["quality.db"]
    })
}
