//! Postgres persistence for waypoint: connection config, pool, embedded
//! migrations, row models and per-table query functions.
//!
//! Every query is scoped to an owner (`user_id`). Rows reachable only through
//! another user's goal are reported as not found.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
