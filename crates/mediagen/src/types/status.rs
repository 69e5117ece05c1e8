//! Task status enumeration exchanged with the backend

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a generation task.
///
/// `Idle` never comes from the backend; it is the tracker's state when no
/// task is active and serializes as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No task
    #[default]
    #[serde(rename = "")]
    Idle,
    /// The backend is processing the batch
    Running,
    /// A cancel was requested and the backend is interrupting the job
    Cancelling,
    /// Every item was processed
    Completed,
    /// The job failed
    Error,
    /// The job was cancelled
    Cancelled,
    /// The backend has no record of the task
    NotFound,
}

impl TaskStatus {
    /// Whether no further progress will be reported after this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Error | Self::Cancelled | Self::NotFound
        )
    }

    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
