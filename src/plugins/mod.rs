//! Domain subsystems. Each owns its CLI subtree, its storage access and a `schema()`.

pub mod lifecycle;
pub mod policy;
pub mod records;
pub mod users;
