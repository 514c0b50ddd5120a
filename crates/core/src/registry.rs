//! Action-type name to executor dispatch table.
//!
//! Populated once at startup, then shared read-only across workers via
//! `Arc<ActionRegistry>`. Registration takes `&mut self`, so the borrow
//! checker enforces the register-then-resolve ordering.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::ActionExecutor;
use crate::error::RegistryError;

/// Maps action-type names to executor capabilities.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `executor` under `name`. A prior entry for the same name is
    /// replaced.
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ActionExecutor>) {
        let name = name.into();
        if self.executors.insert(name.clone(), executor).is_some() {
            tracing::debug!(action_type = %name, "Replaced existing action executor");
        }
    }

    /// Look up the executor registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ActionExecutor>, RegistryError> {
        self.executors
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownActionType(name.to_string()))
    }

    /// Registered action-type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_types", &self.names())
            .finish()
    }
}
