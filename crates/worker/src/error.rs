//! Startup errors for the worker process.

use crate::broker::ConsumerError;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Broker error: {0}")]
    Broker(#[from] ConsumerError),
}
