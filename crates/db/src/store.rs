//! [`InstructionStore`] backed by PostgreSQL.

use async_trait::async_trait;
use relay_core::{ActionConfig, ExecutionRecord, InstructionStore, RelayInstruction, StoreError};

use crate::repositories::{ExecutionLogRepo, RelayRepo};
use crate::DbPool;

/// Resolves relay instructions and writes execution logs through the
/// repository layer. Cheap to clone; the pool is reference counted.
#[derive(Debug, Clone)]
pub struct PgInstructionStore {
    pool: DbPool,
}

impl PgInstructionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstructionStore for PgInstructionStore {
    async fn lookup(&self, relay_id: &str) -> Result<RelayInstruction, StoreError> {
        let row = RelayRepo::find_active_instruction(&self.pool, relay_id)
            .await
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::NotFound(relay_id.to_string()))?;

        let config = config_object(row.config).map_err(|kind| {
            StoreError::backend(format!(
                "Relay {relay_id} config must be a JSON object, got {kind}"
            ))
        })?;

        Ok(RelayInstruction {
            relay_id: row.relay_id,
            action_type: row.action_type,
            config,
        })
    }

    async fn append_execution_record(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let id = ExecutionLogRepo::insert(
            &self.pool,
            &record.relay_id,
            record.status.as_str(),
            &record.details,
            record.executed_at,
        )
        .await
        .map_err(StoreError::backend)?;
        tracing::debug!(log_id = id, relay_id = %record.relay_id, "Execution log written");
        Ok(())
    }
}

/// Unwrap a stored JSONB config into a key/value map. `null` is treated as
/// an empty config.
fn config_object(value: serde_json::Value) -> Result<ActionConfig, &'static str> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(ActionConfig::new()),
        serde_json::Value::Array(_) => Err("array"),
        serde_json::Value::String(_) => Err("string"),
        serde_json::Value::Number(_) => Err("number"),
        serde_json::Value::Bool(_) => Err("boolean"),
    }
}
