//! Core modules for QualityGuard.
//!
//! Shared primitives every subsystem builds on: storage plumbing, configuration,
//! logging, schema migrations and the RPC boundary.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migration;
pub mod output;
pub mod pool;
pub mod rpc;
pub mod schemas;
pub mod store;
pub mod time;
