//! Generation task tracker
//!
//! [`GenerationTracker`] drives one long-running backend job at a time:
//!
//! - [`start`](GenerationTracker::start) submits a batch through a caller
//!   supplied launch call and starts polling
//! - every poll tick reconciles the reported completion count with the
//!   submitted prompt ids, by position
//! - a terminal status stops polling, emits one notification and resets the
//!   tracker after a short display delay
//! - [`stop`](GenerationTracker::stop) only asks the backend to cancel; the
//!   next poll tick observes the outcome
//!
//! Every failure funnels through the same lifecycle reset, so the tracker is
//! never left running without a timer. Dropping the tracker releases the
//! timer, every in-flight poll and any pending reset immediately.
//!
//! # Example
//!
//! ```rust,no_run
//! use mediagen::{Client, GenerationPrompt, GenerateImageParams, ImageSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("http://localhost:8000");
//! let tracker = client.tracker();
//!
//! let prompts = vec![
//!     GenerationPrompt::new("span_1", "a harbour at night"),
//!     GenerationPrompt::new("span_2", "a lighthouse in fog"),
//! ];
//! let params = GenerateImageParams::builder()
//!     .project_name("novel")
//!     .chapter_name("chapter_1")
//!     .image_settings(ImageSettings::new(1024, 768, "ink"))
//!     .generation_prompts(&prompts)
//!     .build()?;
//!
//! let media = client.media();
//! tracker
//!     .start(prompts, || async move { media.generate_images(&params).await })
//!     .await;
//!
//! let mut updates = tracker.subscribe();
//! while updates.changed().await.is_ok() {
//!     let progress = updates.borrow().clone();
//!     println!("{}/{} done: {:?}", progress.current, progress.total, progress.completed_ids);
//!     if progress.is_idle() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod notify;
mod state;

pub use backend::TaskBackend;
pub use notify::{MessageKey, Notification, NotificationLevel, Notifier, TracingNotifier};

#[cfg(test)]
pub(crate) use backend::MockTaskBackend;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use mediagen_core::guard::ScopeGuard;
use mediagen_core::schedule::{DelayedTask, RepeatingTimer};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::types::{GenerationProgress, GenerationPrompt, LaunchReceipt, ProgressReport, TaskStatus};
use state::{Released, TrackerState};

/// What a call to [`GenerationTracker::start`] did.
#[derive(Debug)]
pub enum StartOutcome {
    /// The batch was launched and polling has started.
    Started {
        /// Backend task id
        task_id: String,
    },
    /// The call was rejected locally; the launch call was never made.
    Rejected(RejectReason),
    /// The launch call failed and the tracker was reset.
    LaunchFailed(Error),
    /// The tracker was reset while the launch call was in flight, so the
    /// launched task is not tracked.
    Abandoned {
        /// Backend task id of the untracked task
        task_id: String,
    },
}

impl StartOutcome {
    /// Whether polling started.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }

    /// The backend task id, if a task was launched.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Started { task_id } | Self::Abandoned { task_id } => Some(task_id),
            _ => None,
        }
    }
}

/// Why a start request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No prompts were given
    EmptyBatch,
    /// A task is already active on this tracker
    AlreadyGenerating,
}

/// Tracks one generation task at a time against a [`TaskBackend`].
///
/// State is exposed read-only: [`progress`](Self::progress) returns a
/// snapshot and [`subscribe`](Self::subscribe) streams every change.
pub struct GenerationTracker<B: TaskBackend> {
    shared: Arc<Shared<B>>,
}

struct Shared<B> {
    backend: B,
    config: TrackerConfig,
    notifier: Arc<dyn Notifier>,
    state: Mutex<TrackerState>,
    progress_tx: watch::Sender<GenerationProgress>,
}

impl<B: TaskBackend> GenerationTracker<B> {
    /// Create a tracker with default timing that logs notifications.
    pub fn new(backend: B) -> Self {
        Self::from_parts(backend, TrackerConfig::default(), Arc::new(TracingNotifier))
    }

    /// Create a builder for custom timing or a custom notifier.
    pub fn builder(backend: B) -> GenerationTrackerBuilder<B> {
        GenerationTrackerBuilder {
            backend,
            config: TrackerConfig::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Config must already be validated.
    pub(crate) fn with_config(backend: B, config: TrackerConfig) -> Self {
        Self::from_parts(backend, config, Arc::new(TracingNotifier))
    }

    fn from_parts(backend: B, config: TrackerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let (progress_tx, _) = watch::channel(GenerationProgress::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                notifier,
                state: Mutex::new(TrackerState::default()),
                progress_tx,
            }),
        }
    }

    /// Submit a batch and start polling its progress.
    ///
    /// `launch` performs the job-specific request and resolves to the
    /// backend's receipt. It is only called when the batch is non-empty and
    /// no task is active. Failures never surface as `Err`: they emit a
    /// notification, reset the tracker and are reported in the outcome.
    ///
    /// If the returned future is dropped while `launch` is pending, the
    /// tracker resets.
    pub async fn start<F, Fut>(
        &self,
        prompts: impl Into<Vec<GenerationPrompt>>,
        launch: F,
    ) -> StartOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LaunchReceipt>>,
    {
        let prompts = prompts.into();
        if prompts.is_empty() {
            warn!("Generation requested with an empty batch");
            self.shared.notify(Notification::warning(MessageKey::NoPrompts));
            return StartOutcome::Rejected(RejectReason::EmptyBatch);
        }
        let batch_size = prompts.len();

        let epoch = {
            let mut state = self.shared.lock();
            if state.generating {
                None
            } else {
                state.generating = true;
                state.prompts = prompts;
                state.progress.completed_ids.clear();
                self.shared.publish(&state);
                Some(state.epoch)
            }
        };
        let Some(epoch) = epoch else {
            warn!("Generation requested while another task is active");
            self.shared.notify(Notification::warning(MessageKey::InProgress));
            return StartOutcome::Rejected(RejectReason::AlreadyGenerating);
        };

        let shared = self.shared.clone();
        let abandoned = ScopeGuard::new(move || {
            if shared.reset_if_epoch(epoch) {
                warn!("Generation launch dropped before completion");
            }
        });

        let result = launch().await.and_then(|receipt| {
            if receipt.task_id.is_empty() {
                Err(Error::ResponseValidation(
                    "launch response has an empty task id".to_string(),
                ))
            } else {
                Ok(receipt)
            }
        });
        abandoned.disarm();

        match result {
            Ok(receipt) => self.begin_polling(epoch, batch_size, receipt),
            Err(err) => {
                error!(error = %err, "Failed to start generation");
                self.shared.reset_if_epoch(epoch);
                self.shared.notify(
                    Notification::error(MessageKey::OperationFailed).with_detail(err.to_string()),
                );
                StartOutcome::LaunchFailed(err)
            }
        }
    }

    fn begin_polling(&self, epoch: u64, batch_size: usize, receipt: LaunchReceipt) -> StartOutcome {
        let LaunchReceipt { task_id, total, .. } = receipt;

        let previous = {
            let mut state = self.shared.lock();
            if state.torn_down || state.epoch != epoch {
                None
            } else {
                state.progress.task_id = task_id.clone();
                state.progress.total = total;
                state.progress.current = 0;
                state.progress.status = TaskStatus::Running;
                state.last_applied_seq = 0;

                let previous = state.release();
                let weak = Arc::downgrade(&self.shared);
                state.timer = Some(RepeatingTimer::start(
                    self.shared.config.poll_interval,
                    move |seq| poll_tick(weak.clone(), epoch, seq),
                ));
                self.shared.publish(&state);
                Some(previous)
            }
        };

        let Some(previous) = previous else {
            warn!(task_id = %task_id, "Tracker was reset while the launch was in flight");
            return StartOutcome::Abandoned { task_id };
        };
        drop(previous);

        if total as usize != batch_size {
            warn!(
                task_id = %task_id,
                total,
                submitted = batch_size,
                "Backend batch size differs from the submitted prompts"
            );
        }
        info!(task_id = %task_id, total, "Generation task started");
        StartOutcome::Started { task_id }
    }

    /// Ask the backend to cancel the active task.
    ///
    /// Does nothing and returns `false` when no task is held. Local progress
    /// is left alone; the next poll tick observes the cancelled status. If
    /// the cancel request fails the tracker resets.
    ///
    /// Returns whether the backend accepted the request.
    pub async fn stop(&self) -> bool {
        let target = {
            let state = self.shared.lock();
            state
                .has_task()
                .then(|| (state.progress.task_id.clone(), state.epoch))
        };
        let Some((task_id, epoch)) = target else {
            debug!("Stop requested with no active task");
            return false;
        };

        info!(task_id = %task_id, "Requesting generation cancel");
        match self.shared.backend.cancel(&task_id).await {
            Ok(()) => {
                self.shared
                    .notify(Notification::success(MessageKey::StopRequested));
                true
            }
            Err(err) => {
                let err = err.context(format!("cancel of task {task_id}"));
                error!(task_id = %task_id, error = %err, "Failed to stop generation");
                self.shared.reset_if_epoch(epoch);
                self.shared
                    .notify(Notification::error(MessageKey::Error).with_detail(err.to_string()));
                false
            }
        }
    }

    /// Return to idle immediately, releasing the timer and any pending reset.
    ///
    /// Safe to call at any time, including when already idle.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Snapshot of the current progress.
    pub fn progress(&self) -> GenerationProgress {
        self.shared.lock().progress.clone()
    }

    /// Whether a task is being launched, tracked or displayed.
    pub fn is_generating(&self) -> bool {
        self.shared.lock().generating
    }

    /// Watch every published progress snapshot.
    pub fn subscribe(&self) -> watch::Receiver<GenerationProgress> {
        self.shared.progress_tx.subscribe()
    }

    /// Timing used by this tracker.
    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// The backend this tracker polls.
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }
}

impl<B: TaskBackend> Drop for GenerationTracker<B> {
    fn drop(&mut self) {
        let released = {
            let mut state = self.shared.lock();
            state.torn_down = true;
            state.release()
        };
        drop(released);
        debug!("Generation tracker torn down");
    }
}

impl<B: TaskBackend> fmt::Debug for GenerationTracker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("GenerationTracker")
            .field("config", &self.shared.config)
            .field("generating", &state.generating)
            .field("progress", &state.progress)
            .finish_non_exhaustive()
    }
}

impl<B: TaskBackend> Shared<B> {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &TrackerState) {
        self.progress_tx.send_replace(state.progress.clone());
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    fn reset(&self) {
        let (released, task_id) = {
            let mut state = self.lock();
            let task_id = std::mem::take(&mut state.progress.task_id);
            let released = state.reset();
            self.publish(&state);
            (released, task_id)
        };
        drop(released);

        if task_id.is_empty() {
            debug!("Generation tracker reset while idle");
        } else {
            info!(task_id = %task_id, "Generation tracker reset");
        }
    }

    /// Reset only if no reset happened since `epoch` and the tracker is alive.
    fn reset_if_epoch(&self, epoch: u64) -> bool {
        let released = {
            let mut state = self.lock();
            if state.torn_down || state.epoch != epoch {
                return false;
            }
            let released = state.reset();
            self.publish(&state);
            released
        };
        drop(released);
        debug!(epoch, "Generation tracker reset");
        true
    }

    fn apply_poll(
        self: &Arc<Self>,
        epoch: u64,
        seq: u64,
        task_id: &str,
        result: Result<ProgressReport>,
    ) {
        let mut notification = None;

        let released = {
            let mut state = self.lock();
            if state.torn_down || state.epoch != epoch {
                debug!(task_id, seq, "Ignoring poll response for a finished task");
                return;
            }
            if seq <= state.last_applied_seq || state.progress.status.is_terminal() {
                debug!(
                    task_id,
                    seq,
                    last_applied = state.last_applied_seq,
                    "Ignoring stale poll response"
                );
                return;
            }
            state.last_applied_seq = seq;

            let released = match result {
                Err(err) => {
                    let err = err.context(format!("progress check for task {task_id}"));
                    error!(task_id, error = %err, "Failed to check generation progress");
                    notification =
                        Some(Notification::error(MessageKey::Error).with_detail(err.to_string()));
                    state.reset()
                }
                Ok(report) => {
                    let status = report.status;
                    state.apply_report(report);
                    debug!(
                        task_id,
                        seq,
                        status = %status,
                        current = state.progress.current,
                        total = state.progress.total,
                        "Generation progress"
                    );

                    if status.is_terminal() {
                        // Detach the timer before anything is announced.
                        let released = state.release();
                        info!(
                            task_id,
                            status = %status,
                            current = state.progress.current,
                            total = state.progress.total,
                            "Generation task finished"
                        );
                        notification = terminal_notification(status, &state.progress.errors);
                        state.pending_reset = Some(self.schedule_reset(epoch));
                        released
                    } else {
                        Released::default()
                    }
                }
            };
            self.publish(&state);
            released
        };
        drop(released);

        if let Some(notification) = notification {
            self.notify(notification);
        }
    }

    fn schedule_reset(self: &Arc<Self>, epoch: u64) -> DelayedTask {
        let weak = Arc::downgrade(self);
        DelayedTask::schedule(self.config.reset_delay, async move {
            if let Some(shared) = weak.upgrade() {
                shared.reset_if_epoch(epoch);
            }
        })
    }
}

async fn poll_tick<B: TaskBackend>(shared: Weak<Shared<B>>, epoch: u64, seq: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let task_id = {
        let state = shared.lock();
        if state.torn_down || state.epoch != epoch {
            return;
        }
        state.has_task().then(|| state.progress.task_id.clone())
    };
    let Some(task_id) = task_id else {
        debug!(seq, "Poll tick without an active task");
        shared.reset_if_epoch(epoch);
        return;
    };

    let result = shared.backend.progress(&task_id).await;
    shared.apply_poll(epoch, seq, &task_id, result);
}

fn terminal_notification(status: TaskStatus, errors: &[String]) -> Option<Notification> {
    match status {
        TaskStatus::Completed => Some(Notification::success(MessageKey::Success)),
        TaskStatus::Cancelled => Some(Notification::info(MessageKey::Cancelled)),
        TaskStatus::Error if !errors.is_empty() => Some(
            Notification::error(MessageKey::GenerationFailed).with_detail(errors.join("\n")),
        ),
        TaskStatus::Error | TaskStatus::NotFound => Some(Notification::error(MessageKey::Error)),
        TaskStatus::Idle | TaskStatus::Running | TaskStatus::Cancelling => None,
    }
}

/// Builder for [`GenerationTracker`].
pub struct GenerationTrackerBuilder<B> {
    backend: B,
    config: TrackerConfig,
    notifier: Arc<dyn Notifier>,
}

impl<B: TaskBackend> GenerationTrackerBuilder<B> {
    /// Use the given timing.
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver notifications to `notifier` instead of the log.
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Deliver notifications to a shared notifier.
    pub fn shared_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the timing is invalid.
    pub fn build(self) -> Result<GenerationTracker<B>> {
        self.config.validate()?;
        Ok(GenerationTracker::from_parts(
            self.backend,
            self.config,
            self.notifier,
        ))
    }
}

impl<B: fmt::Debug> fmt::Debug for GenerationTrackerBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationTrackerBuilder")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<Notification>>>;

    fn tracker(backend: MockTaskBackend) -> (GenerationTracker<MockTaskBackend>, Seen) {
        let seen: Seen = Arc::default();
        let sink = seen.clone();
        let tracker = GenerationTracker::builder(backend)
            .notifier(move |n: Notification| sink.lock().unwrap().push(n))
            .build()
            .unwrap();
        (tracker, seen)
    }

    fn keys(seen: &Seen) -> Vec<MessageKey> {
        seen.lock().unwrap().iter().map(|n| n.key).collect()
    }

    fn batch() -> Vec<GenerationPrompt> {
        vec![
            GenerationPrompt::new("a", "first"),
            GenerationPrompt::new("b", "second"),
        ]
    }

    #[tokio::test]
    async fn test_stop_without_task_is_noop() {
        let (tracker, seen) = tracker(MockTaskBackend::new());
        assert!(!tracker.stop().await);
        assert!(keys(&seen).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_forwards_task_id_and_keeps_progress() {
        let mut backend = MockTaskBackend::new();
        backend
            .expect_cancel()
            .with(eq("T1"))
            .times(1)
            .returning(|_| Ok(()));
        let (tracker, seen) = tracker(backend);

        let outcome = tracker
            .start(batch(), || async { Ok(LaunchReceipt::new("T1", 2)) })
            .await;
        assert_matches!(outcome, StartOutcome::Started { ref task_id } if task_id == "T1");
        let before = tracker.progress();

        assert!(tracker.stop().await);
        assert_eq!(tracker.progress(), before);
        assert_eq!(keys(&seen), vec![MessageKey::StopRequested]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_failure_resets() {
        let mut backend = MockTaskBackend::new();
        backend
            .expect_cancel()
            .returning(|_| Err(Error::Connection("refused".into())));
        let (tracker, seen) = tracker(backend);

        tracker
            .start(batch(), || async { Ok(LaunchReceipt::new("T1", 2)) })
            .await;
        assert!(!tracker.stop().await);

        assert!(tracker.progress().is_idle());
        assert!(!tracker.is_generating());
        assert_eq!(keys(&seen), vec![MessageKey::Error]);
        assert_eq!(
            seen.lock().unwrap()[0].detail.as_deref(),
            Some("cancel of task T1: Connection error: refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_task_id_is_a_launch_failure() {
        let (tracker, seen) = tracker(MockTaskBackend::new());

        let outcome = tracker
            .start(batch(), || async { Ok(LaunchReceipt::new("", 2)) })
            .await;

        assert_matches!(outcome, StartOutcome::LaunchFailed(Error::ResponseValidation(_)));
        assert!(!tracker.is_generating());
        assert_eq!(keys(&seen), vec![MessageKey::OperationFailed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_resets_immediately() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut backend = MockTaskBackend::new();
        backend
            .expect_progress()
            .with(eq("T1"))
            .returning(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout(Duration::from_secs(60)))
            });
        let (tracker, seen) = tracker(backend);

        tracker
            .start(batch(), || async { Ok(LaunchReceipt::new("T1", 2)) })
            .await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(tracker.progress().is_idle());
        assert!(!tracker.is_generating());
        assert_eq!(keys(&seen), vec![MessageKey::Error]);
        assert_eq!(
            seen.lock().unwrap()[0].detail.as_deref(),
            Some("progress check for task T1: Request timeout after 60s")
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[rstest::rstest]
    #[case(TaskStatus::Completed, &[], NotificationLevel::Success, MessageKey::Success, None)]
    #[case(TaskStatus::Cancelled, &[], NotificationLevel::Info, MessageKey::Cancelled, None)]
    #[case(TaskStatus::Error, &[], NotificationLevel::Error, MessageKey::Error, None)]
    #[case(TaskStatus::NotFound, &[], NotificationLevel::Error, MessageKey::Error, None)]
    #[case(
        TaskStatus::Error,
        &["render failed", "disk full"],
        NotificationLevel::Error,
        MessageKey::GenerationFailed,
        Some("render failed\ndisk full")
    )]
    fn test_terminal_notification(
        #[case] status: TaskStatus,
        #[case] errors: &[&str],
        #[case] level: NotificationLevel,
        #[case] key: MessageKey,
        #[case] detail: Option<&str>,
    ) {
        let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        let n = terminal_notification(status, &errors).unwrap();
        assert_eq!(n.level, level);
        assert_eq!(n.key, key);
        assert_eq!(n.detail.as_deref(), detail);
    }

    #[test]
    fn test_non_terminal_statuses_are_silent() {
        assert!(terminal_notification(TaskStatus::Running, &[]).is_none());
        assert!(terminal_notification(TaskStatus::Cancelling, &[]).is_none());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = GenerationTracker::builder(MockTaskBackend::new())
            .config(TrackerConfig::default().poll_interval(Duration::ZERO))
            .build();
        assert_matches!(result, Err(Error::InvalidRequest(_)));
    }
}
