//! Command handlers: bridge CLI args to the core reconciliation engine.

pub mod apply;
pub mod config_cmd;
pub mod export;
