//! Repository for the `relays` and `relay_actions` tables.

use sqlx::PgPool;

use crate::models::relay::{CreateRelay, Relay, RelayAction, RelayInstructionRow};

/// Column list for `relays` queries.
const RELAY_COLUMNS: &str = "id, name, active, created_at, updated_at";

/// Column list for `relay_actions` queries.
const ACTION_COLUMNS: &str = "id, relay_id, action_type, config, created_at";

/// Provides read/write operations for relays and their actions.
pub struct RelayRepo;

impl RelayRepo {
    /// Resolve the action of an active relay.
    ///
    /// Returns `None` when the relay is missing, inactive, or has no action.
    /// A relay with several actions resolves to the oldest one.
    pub async fn find_active_instruction(
        pool: &PgPool,
        relay_id: &str,
    ) -> Result<Option<RelayInstructionRow>, sqlx::Error> {
        sqlx::query_as::<_, RelayInstructionRow>(
            "SELECT r.id AS relay_id, a.action_type, a.config \
             FROM relays r \
             JOIN relay_actions a ON a.relay_id = r.id \
             WHERE r.id = $1 AND r.active = TRUE \
             ORDER BY a.id \
             LIMIT 1",
        )
        .bind(relay_id)
        .fetch_optional(pool)
        .await
    }

    /// Insert a relay and its action in one transaction.
    pub async fn create(pool: &PgPool, input: &CreateRelay) -> Result<(Relay, RelayAction), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let relay_query = format!(
            "INSERT INTO relays (id, name) VALUES ($1, $2) RETURNING {RELAY_COLUMNS}"
        );
        let relay = sqlx::query_as::<_, Relay>(&relay_query)
            .bind(&input.id)
            .bind(&input.name)
            .fetch_one(&mut *tx)
            .await?;

        let action_query = format!(
            "INSERT INTO relay_actions (relay_id, action_type, config) \
             VALUES ($1, $2, $3) \
             RETURNING {ACTION_COLUMNS}"
        );
        let action = sqlx::query_as::<_, RelayAction>(&action_query)
            .bind(&input.id)
            .bind(&input.action_type)
            .bind(&input.config)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((relay, action))
    }

    /// Activate or deactivate a relay. Returns `true` if a row was updated.
    pub async fn set_active(pool: &PgPool, relay_id: &str, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE relays SET active = $2, updated_at = NOW() WHERE id = $1")
            .bind(relay_id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a relay by id regardless of its active flag.
    pub async fn find_by_id(pool: &PgPool, relay_id: &str) -> Result<Option<Relay>, sqlx::Error> {
        let query = format!("SELECT {RELAY_COLUMNS} FROM relays WHERE id = $1");
        sqlx::query_as::<_, Relay>(&query)
            .bind(relay_id)
            .fetch_optional(pool)
            .await
    }
}
