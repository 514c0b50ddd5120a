//! Row models for the relay tables.

pub mod execution_log;
pub mod relay;
