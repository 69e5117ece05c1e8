//! The backend operations a tracker needs after a task has been launched

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::ProgressReport;

/// Progress and cancel calls for a launched task.
///
/// [`Client`](crate::Client) implements this against the HTTP endpoints.
/// Launching is not part of the trait: every job type has its own launch
/// parameters, so [`GenerationTracker::start`](super::GenerationTracker::start)
/// takes the launch call as a closure instead.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskBackend: Send + Sync + 'static {
    /// Query the status of `task_id`.
    async fn progress(&self, task_id: &str) -> Result<ProgressReport>;

    /// Ask the backend to cancel `task_id`.
    async fn cancel(&self, task_id: &str) -> Result<()>;
}

#[async_trait]
impl<B: TaskBackend + ?Sized> TaskBackend for Arc<B> {
    async fn progress(&self, task_id: &str) -> Result<ProgressReport> {
        (**self).progress(task_id).await
    }

    async fn cancel(&self, task_id: &str) -> Result<()> {
        (**self).cancel(task_id).await
    }
}
