//! Command-line surface wiring the knowledge-engine crates together:
//! config resolution, store/client construction, and per-command dispatch.

pub mod cli;
pub mod commands;
pub mod context;
