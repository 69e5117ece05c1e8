//! Tracker state and progress reconciliation

use mediagen_core::schedule::{DelayedTask, RepeatingTimer};

use crate::types::{GenerationProgress, GenerationPrompt, ProgressReport};

/// Mutable state owned by one tracker.
#[derive(Debug, Default)]
pub(crate) struct TrackerState {
    pub(crate) progress: GenerationProgress,
    /// Set from the moment `start` takes the lock until the lifecycle reset.
    pub(crate) generating: bool,
    /// Immutable copy of the submitted batch, used only for reconciliation.
    pub(crate) prompts: Vec<GenerationPrompt>,
    /// Advances on every lifecycle reset.
    pub(crate) epoch: u64,
    /// Tick number of the last poll response applied in this epoch.
    pub(crate) last_applied_seq: u64,
    pub(crate) torn_down: bool,
    pub(crate) timer: Option<RepeatingTimer>,
    pub(crate) pending_reset: Option<DelayedTask>,
}

/// Scheduled work detached from the state so it can be dropped after the
/// state lock is released.
#[derive(Debug, Default)]
#[must_use]
pub(crate) struct Released {
    timer: Option<RepeatingTimer>,
    pending_reset: Option<DelayedTask>,
}

impl Drop for Released {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
        }
        if let Some(task) = self.pending_reset.as_mut() {
            task.cancel();
        }
    }
}

impl TrackerState {
    /// Return every field to its idle default and detach scheduled work.
    ///
    /// Idempotent apart from advancing the epoch, which invalidates responses
    /// still in flight for the previous task.
    pub(crate) fn reset(&mut self) -> Released {
        self.progress = GenerationProgress::default();
        self.generating = false;
        self.prompts.clear();
        self.epoch += 1;
        self.last_applied_seq = 0;
        self.release()
    }

    /// Detach scheduled work without touching progress.
    pub(crate) fn release(&mut self) -> Released {
        Released {
            timer: self.timer.take(),
            pending_reset: self.pending_reset.take(),
        }
    }

    /// Whether a task id is held.
    pub(crate) fn has_task(&self) -> bool {
        !self.progress.task_id.is_empty()
    }

    /// Apply a poll report: map newly completed positions to prompt ids,
    /// then overwrite the reported fields.
    pub(crate) fn apply_report(&mut self, report: ProgressReport) {
        reconcile(&mut self.progress.completed_ids, &self.prompts, report.current);

        self.progress.status = report.status;
        self.progress.current = report.current;
        self.progress.total = report.total;
        self.progress.errors = report.errors;
        self.progress.current_prompt = report.current_prompt;
    }
}

/// Append the ids at positions `[completed.len(), current)` of `prompts`.
///
/// The backend processes prompts in submission order, so a completion count
/// identifies items by position. Counts at or below what is already known
/// change nothing. Counts beyond the batch are clamped to it.
pub(crate) fn reconcile(completed: &mut Vec<String>, prompts: &[GenerationPrompt], current: u32) {
    let known = completed.len();
    let reported = current as usize;
    if reported <= known {
        return;
    }

    let end = reported.min(prompts.len());
    if end < reported {
        tracing::warn!(
            reported,
            submitted = prompts.len(),
            "Backend reported more completed items than were submitted"
        );
    }

    if known < end {
        completed.extend(prompts[known..end].iter().map(|p| p.id.clone()));
    }
}
