//! Core of waypoint: canned plan templates, the store abstraction, goal
//! expansion, the agent recorder and the auto-start workflow runner.

pub mod agent;
pub mod goal;
pub mod runner;
pub mod store;
pub mod templates;
