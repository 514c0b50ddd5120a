//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod execution_log_repo;
pub mod relay_repo;

pub use execution_log_repo::ExecutionLogRepo;
pub use relay_repo::RelayRepo;
