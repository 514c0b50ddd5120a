//! Execution audit log entity model.

use serde::Serialize;
use sqlx::FromRow;
use relay_core::types::{DbId, Timestamp};

/// A row from the `execution_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExecutionLog {
    pub id: DbId,
    pub relay_id: String,
    /// `"success"` or `"failed"`.
    pub status: String,
    pub details: String,
    pub executed_at: Timestamp,
}
