//! Progress reports from the backend and the tracker's progress snapshot

use serde::{Deserialize, Deserializer, Serialize};

use super::TaskStatus;

/// Response of the job-launch endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchReceipt {
    /// Backend-assigned task id
    pub task_id: String,
    /// Number of items in the batch
    pub total: u32,
    /// Initial status, if the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Errors collected while queueing the batch
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

impl LaunchReceipt {
    /// Create a receipt for `task_id` covering `total` items.
    pub fn new(task_id: impl Into<String>, total: u32) -> Self {
        Self {
            task_id: task_id.into(),
            total,
            status: None,
            errors: Vec::new(),
        }
    }
}

/// Response of the progress endpoint.
///
/// A `not_found` report carries only `status`; every other field defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Current task status
    pub status: TaskStatus,
    /// Items processed so far, successful or not
    #[serde(default)]
    pub current: u32,
    /// Batch size
    #[serde(default)]
    pub total: u32,
    /// Error messages collected so far
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
    /// Prompt the backend is working on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_prompt: Option<String>,
    /// `"image"` or `"audio"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

impl ProgressReport {
    /// Report with the given status and counts and no errors.
    pub fn new(status: TaskStatus, current: u32, total: u32) -> Self {
        Self {
            status,
            current,
            total,
            ..Default::default()
        }
    }

    /// Attach backend error messages.
    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }
}

/// Snapshot of a tracker's progress.
///
/// Handed out by value; mutating a snapshot never affects the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GenerationProgress {
    /// Items the backend reports as processed
    pub current: u32,
    /// Batch size
    pub total: u32,
    /// Current status (`Idle` when no task is active)
    pub status: TaskStatus,
    /// Backend task id, empty when idle
    pub task_id: String,
    /// Errors reported for the current task
    pub errors: Vec<String>,
    /// Ids of submitted prompts inferred as completed, in submission order
    pub completed_ids: Vec<String>,
    /// Prompt the backend is working on, if reported
    pub current_prompt: Option<String>,
}

impl GenerationProgress {
    /// Whether the snapshot is in the idle state.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Fraction of the batch processed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (f64::from(self.current) / f64::from(self.total)).min(1.0)
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
