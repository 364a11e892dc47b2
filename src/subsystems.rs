//! Subsystem registration: centralizes all DB initialization functions.
//!
//! Adding a new subsystem: append one entry to `SUBSYSTEMS`.

use crate::core::error;
use crate::plugins::{records, users};
use std::path::Path;

pub(crate) struct SubsystemInit {
    pub name: &'static str,
    pub initialize_db: fn(&Path) -> Result<(), error::QualityError>,
}

/// Order matters: `records` shares `quality.db` with `users`, and the users
/// initializer runs the shared schema migrations first.
pub(crate) const SUBSYSTEMS: &[SubsystemInit] = &[
    SubsystemInit { name: "users", initialize_db: users::initialize_users_db },
    SubsystemInit { name: "records", initialize_db: records::initialize_records_db },
];

/// Initialize all subsystem databases sequentially.
pub(crate) fn initialize_all_dbs(data_root: &Path) -> Result<(), error::QualityError> {
    for sub in SUBSYSTEMS {
        tracing::debug!(subsystem = sub.name, "initializing subsystem db");
        (sub.initialize_db)(data_root)?;
    }
    Ok(())
}

/// Names of the registered subsystems, in initialization order.
pub fn subsystem_names() -> Vec<&'static str> {
    SUBSYSTEMS.iter().map(|s| s.name).collect()
}
