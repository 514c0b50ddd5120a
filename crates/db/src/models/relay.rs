//! Relay and relay-action entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use relay_core::types::{DbId, Timestamp};

/// A row from the `relays` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Relay {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `relay_actions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RelayAction {
    pub id: DbId,
    pub relay_id: String,
    pub action_type: String,
    pub config: serde_json::Value,
    pub created_at: Timestamp,
}

/// Joined projection used to resolve a relay's instructions.
#[derive(Debug, Clone, FromRow)]
pub struct RelayInstructionRow {
    pub relay_id: String,
    pub action_type: String,
    pub config: serde_json::Value,
}

/// DTO for creating a relay together with its action.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRelay {
    pub id: String,
    pub name: String,
    pub action_type: String,
    pub config: serde_json::Value,
}
