//! Repository for the `execution_logs` table.

use sqlx::PgPool;
use relay_core::types::{DbId, Timestamp};

use crate::models::execution_log::ExecutionLog;

/// Column list for execution_logs queries.
const COLUMNS: &str = "id, relay_id, status, details, executed_at";

/// Provides data-access methods for the execution audit trail.
pub struct ExecutionLogRepo;

impl ExecutionLogRepo {
    /// Append one audit row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        relay_id: &str,
        status: &str,
        details: &str,
        executed_at: Timestamp,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO execution_logs (relay_id, status, details, executed_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(relay_id)
        .bind(status)
        .bind(details)
        .bind(executed_at)
        .fetch_one(pool)
        .await
    }

    /// List audit rows for a relay, newest first.
    pub async fn list_for_relay(
        pool: &PgPool,
        relay_id: &str,
        limit: i64,
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM execution_logs
             WHERE relay_id = $1
             ORDER BY executed_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(relay_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
