//! Relay instructions and execution audit records.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::action::ActionConfig;
use crate::types::{RelayId, Timestamp};

/// Processing instructions for one relay, read fresh for every work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayInstruction {
    pub relay_id: RelayId,
    /// Key resolved against the [`ActionRegistry`](crate::registry::ActionRegistry).
    pub action_type: String,
    /// Passed verbatim to the executor.
    pub config: ActionConfig,
}

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Outcome stored in the execution audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    /// Column value in `execution_logs.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown execution status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionRecord
// ---------------------------------------------------------------------------

/// One row of the execution audit trail.
///
/// Write-only from the dispatcher's perspective and best-effort: a failure
/// to persist it never changes the work item's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub relay_id: RelayId,
    pub status: ExecutionStatus,
    /// Free text, typically the error message on failure.
    pub details: String,
    pub executed_at: Timestamp,
}

impl ExecutionRecord {
    /// Record a successful execution.
    pub fn success(relay_id: impl Into<RelayId>) -> Self {
        Self::new(relay_id, ExecutionStatus::Success, "Executed successfully")
    }

    /// Record a failed execution with the error text as details.
    pub fn failed(relay_id: impl Into<RelayId>, details: impl Into<String>) -> Self {
        Self::new(relay_id, ExecutionStatus::Failed, details)
    }

    fn new(relay_id: impl Into<RelayId>, status: ExecutionStatus, details: impl Into<String>) -> Self {
        Self {
            relay_id: relay_id.into(),
            status,
            details: details.into(),
            executed_at: Utc::now(),
        }
    }
}
