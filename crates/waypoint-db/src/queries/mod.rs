//! Per-table query functions.

pub mod deployment;
pub mod execution;
pub mod goals;
pub mod plans;
pub mod research;
pub mod sub_tasks;
