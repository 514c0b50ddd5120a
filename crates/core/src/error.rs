/// Errors reported by an [`InstructionStore`](crate::store::InstructionStore).
///
/// The split between [`NotFound`](StoreError::NotFound) and
/// [`Backend`](StoreError::Backend) decides whether a work item is dropped
/// or redelivered.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No active relay exists for the identifier.
    #[error("Relay not found or inactive: {0}")]
    NotFound(String),

    /// Any other store failure (connection, query, malformed row).
    #[error("Store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary error as a backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend(err.into())
    }
}

/// Errors reported by the [`ActionRegistry`](crate::registry::ActionRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),
}
