/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Relay identifiers are opaque string keys into the instruction store.
pub type RelayId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
