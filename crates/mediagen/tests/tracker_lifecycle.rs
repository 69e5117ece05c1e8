//! Tracker lifecycle tests on a paused clock
//!
//! Default timing throughout: first poll one second after launch, one poll
//! per second, terminal state visible for 1.5 seconds before the reset.

mod common;

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use common::{ScriptedBackend, Step, prompts};
use mediagen::{
    Error, GenerationPrompt, LaunchReceipt, MessageKey, NotificationLevel, ProgressReport, RejectReason,
    StartOutcome, TaskStatus,
};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

fn running(current: u32, total: u32) -> Step {
    Step::Report(ProgressReport::new(TaskStatus::Running, current, total))
}

fn finished(status: TaskStatus, current: u32, total: u32) -> Step {
    Step::Report(ProgressReport::new(status, current, total))
}

async fn launched(task_id: &'static str, total: u32) -> mediagen::Result<LaunchReceipt> {
    Ok(LaunchReceipt::new(task_id, total))
}

/// Sleep until just after the given offset from the previous call.
async fn after_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_batch_completes_and_resets() {
    common::init_test_tracing();
    let backend = ScriptedBackend::new([running(1, 3), finished(TaskStatus::Completed, 3, 3)]);
    let (tracker, recorder) = common::tracker(backend.clone());

    let outcome = tracker
        .start(prompts(&["a", "b", "c"]), || launched("T1", 3))
        .await;
    assert_matches!(outcome, StartOutcome::Started { ref task_id } if task_id == "T1");

    let progress = tracker.progress();
    assert_eq!(progress.task_id, "T1");
    assert_eq!(progress.status, TaskStatus::Running);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.current, 0);
    assert!(tracker.is_generating());

    after_ms(1010).await;
    let progress = tracker.progress();
    assert_eq!(progress.completed_ids, vec!["a"]);
    assert_eq!(progress.current, 1);
    assert!(recorder.keys().is_empty());

    after_ms(1000).await;
    let progress = tracker.progress();
    assert_eq!(progress.status, TaskStatus::Completed);
    assert_eq!(progress.completed_ids, vec!["a", "b", "c"]);
    assert!(tracker.is_generating());
    assert_eq!(recorder.keys(), vec![MessageKey::Success]);
    assert_eq!(recorder.all()[0].level, NotificationLevel::Success);

    // Still inside the display window at 3.01s: no poll at 3s.
    after_ms(1000).await;
    assert_eq!(backend.polls(), 2);
    assert_eq!(tracker.progress().status, TaskStatus::Completed);

    after_ms(500).await;
    assert!(tracker.progress().is_idle());
    assert!(!tracker.is_generating());
    assert_eq!(backend.polls(), 2);
    assert_eq!(recorder.keys(), vec![MessageKey::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_is_rejected_without_launch() {
    let backend = ScriptedBackend::new([]);
    let (tracker, recorder) = common::tracker(backend.clone());
    let called = AtomicBool::new(false);

    let outcome = tracker
        .start(Vec::<GenerationPrompt>::new(), || {
            called.store(true, Ordering::SeqCst);
            launched("T1", 0)
        })
        .await;

    assert_matches!(outcome, StartOutcome::Rejected(RejectReason::EmptyBatch));
    assert!(!called.load(Ordering::SeqCst));
    assert!(tracker.progress().is_idle());
    assert!(!tracker.is_generating());
    assert_eq!(recorder.keys(), vec![MessageKey::NoPrompts]);
    assert_eq!(recorder.all()[0].level, NotificationLevel::Warning);

    after_ms(5000).await;
    assert_eq!(backend.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected_while_running() {
    let backend = ScriptedBackend::new([running(1, 2)]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;
    let before = tracker.progress();

    let called = AtomicBool::new(false);
    let outcome = tracker
        .start(prompts(&["x"]), || {
            called.store(true, Ordering::SeqCst);
            launched("T2", 1)
        })
        .await;

    assert_matches!(outcome, StartOutcome::Rejected(RejectReason::AlreadyGenerating));
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(tracker.progress(), before);
    assert_eq!(recorder.keys(), vec![MessageKey::InProgress]);

    // Polling of the first task carries on, against the first batch.
    after_ms(1000).await;
    assert_eq!(backend.polls(), 2);
    assert_eq!(tracker.progress().completed_ids, vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_rejected_during_display_window() {
    let backend = ScriptedBackend::new([finished(TaskStatus::Completed, 1, 1)]);
    let (tracker, _recorder) = common::tracker(backend);

    tracker.start(prompts(&["a"]), || launched("T1", 1)).await;
    after_ms(1010).await;
    assert_eq!(tracker.progress().status, TaskStatus::Completed);

    let outcome = tracker.start(prompts(&["b"]), || launched("T2", 1)).await;
    assert_matches!(outcome, StartOutcome::Rejected(RejectReason::AlreadyGenerating));

    after_ms(1500).await;
    let outcome = tracker.start(prompts(&["b"]), || launched("T2", 1)).await;
    assert!(outcome.is_started());
    assert_eq!(tracker.progress().task_id, "T2");
}

#[tokio::test(start_paused = true)]
async fn test_backend_error_stops_polling() {
    let backend = ScriptedBackend::new([Step::Report(
        ProgressReport::new(TaskStatus::Error, 1, 2).with_errors(["render failed"]),
    )]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;

    let notes = recorder.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert_eq!(notes[0].key, MessageKey::GenerationFailed);
    assert!(notes[0].text().contains("render failed"));
    assert_eq!(tracker.progress().errors, vec!["render failed"]);
    assert_eq!(tracker.progress().completed_ids, vec!["a"]);

    after_ms(1000).await;
    assert_eq!(backend.polls(), 1);
    assert!(!tracker.progress().is_idle());

    after_ms(500).await;
    assert!(tracker.progress().is_idle());
    assert_eq!(backend.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backend_errors_are_joined_with_newlines() {
    let backend = ScriptedBackend::new([Step::Report(
        ProgressReport::new(TaskStatus::Error, 2, 2).with_errors(["seed 1 failed", "seed 2 failed"]),
    )]);
    let (tracker, recorder) = common::tracker(backend);

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;

    assert_eq!(
        recorder.all()[0].detail.as_deref(),
        Some("seed 1 failed\nseed 2 failed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_error_without_details_uses_generic_message() {
    let backend = ScriptedBackend::new([finished(TaskStatus::Error, 0, 2)]);
    let (tracker, recorder) = common::tracker(backend);

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;

    assert_eq!(recorder.keys(), vec![MessageKey::Error]);
    assert!(recorder.all()[0].detail.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_terminal() {
    let backend = ScriptedBackend::new([running(1, 2), finished(TaskStatus::NotFound, 0, 0)]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(2010).await;

    assert_eq!(tracker.progress().status, TaskStatus::NotFound);
    assert_eq!(tracker.progress().completed_ids, vec!["a"]);
    assert_eq!(recorder.keys(), vec![MessageKey::Error]);

    after_ms(1500).await;
    assert!(tracker.progress().is_idle());
    assert_eq!(backend.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_advisory_until_poll_observes_cancel() {
    let backend = ScriptedBackend::new([
        running(1, 3),
        finished(TaskStatus::Cancelling, 1, 3),
        finished(TaskStatus::Cancelled, 1, 3),
    ]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b", "c"]), || launched("T1", 3)).await;
    after_ms(1010).await;
    let before = tracker.progress();

    assert!(tracker.stop().await);
    assert_eq!(backend.cancelled(), vec!["T1"]);
    assert_eq!(tracker.progress(), before);
    assert_eq!(recorder.keys(), vec![MessageKey::StopRequested]);
    assert_eq!(recorder.all()[0].level, NotificationLevel::Success);

    after_ms(1000).await;
    assert_eq!(tracker.progress().status, TaskStatus::Cancelling);
    assert_eq!(recorder.keys().len(), 1);

    after_ms(1000).await;
    assert_eq!(tracker.progress().status, TaskStatus::Cancelled);
    assert_eq!(
        recorder.keys(),
        vec![MessageKey::StopRequested, MessageKey::Cancelled]
    );
    assert_eq!(recorder.all()[1].level, NotificationLevel::Info);

    after_ms(1500).await;
    assert!(tracker.progress().is_idle());
    assert_eq!(backend.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_failure_resets_immediately() {
    let backend = ScriptedBackend::new([running(1, 2)]).failing_cancel("connection reset");
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;

    assert!(!tracker.stop().await);
    assert!(tracker.progress().is_idle());
    assert!(!tracker.is_generating());
    assert_eq!(recorder.keys(), vec![MessageKey::Error]);

    after_ms(3000).await;
    assert_eq!(backend.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_resets_without_delay() {
    let backend = ScriptedBackend::new([running(1, 2), Step::Fail("connection refused")]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(2010).await;

    assert!(tracker.progress().is_idle());
    assert!(!tracker.is_generating());
    assert_eq!(recorder.keys(), vec![MessageKey::Error]);
    assert!(recorder.all()[0].text().contains("connection refused"));

    after_ms(3000).await;
    assert_eq!(backend.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure_resets() {
    let backend = ScriptedBackend::new([]);
    let (tracker, recorder) = common::tracker(backend.clone());

    let outcome = tracker
        .start(prompts(&["a"]), || async {
            Err(Error::Backend {
                message: "style not found".into(),
            })
        })
        .await;

    assert_matches!(outcome, StartOutcome::LaunchFailed(Error::Backend { .. }));
    assert!(tracker.progress().is_idle());
    assert!(!tracker.is_generating());
    assert_eq!(recorder.keys(), vec![MessageKey::OperationFailed]);

    after_ms(3000).await;
    assert_eq!(backend.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_generating_is_set_before_launch_resolves() {
    let backend = ScriptedBackend::new([]);
    let (tracker, _recorder) = common::tracker(backend);
    let tracker = Arc::new(tracker);

    let (release, wait) = tokio::sync::oneshot::channel::<()>();
    let background = tracker.clone();
    let handle = tokio::spawn(async move {
        background
            .start(prompts(&["a"]), || async move {
                let _ = wait.await;
                launched("T1", 1).await
            })
            .await
    });

    tokio::task::yield_now().await;
    assert!(tracker.is_generating());
    assert!(tracker.progress().task_id.is_empty());

    release.send(()).unwrap();
    assert!(handle.await.unwrap().is_started());
    assert_eq!(tracker.progress().task_id, "T1");
}

#[tokio::test(start_paused = true)]
async fn test_dropped_launch_resets() {
    let backend = ScriptedBackend::new([]);
    let (tracker, _recorder) = common::tracker(backend);

    let attempt = tokio::time::timeout(
        Duration::from_secs(5),
        tracker.start(prompts(&["a"]), || future::pending::<mediagen::Result<LaunchReceipt>>()),
    )
    .await;

    assert!(attempt.is_err());
    assert!(!tracker.is_generating());
    assert!(tracker.progress().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_idempotent() {
    let backend = ScriptedBackend::new([running(1, 2)]);
    let (tracker, _recorder) = common::tracker(backend.clone());

    tracker.reset();
    let idle = tracker.progress();
    assert!(idle.is_idle());

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    after_ms(1010).await;

    tracker.reset();
    let first = tracker.progress();
    tracker.reset();
    assert_eq!(tracker.progress(), first);
    assert_eq!(first, idle);
    assert!(!tracker.is_generating());

    after_ms(3000).await;
    assert_eq!(backend.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_poll_response_is_ignored() {
    let backend = ScriptedBackend::new([
        Step::Delayed(
            Duration::from_millis(1500),
            ProgressReport::new(TaskStatus::Running, 1, 3),
        ),
        running(2, 3),
    ]);
    let (tracker, _recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a", "b", "c"]), || launched("T1", 3)).await;

    // Tick 2 answers at 2s while tick 1 is still in flight until 2.5s.
    after_ms(2010).await;
    assert_eq!(tracker.progress().current, 2);
    assert_eq!(tracker.progress().completed_ids, vec!["a", "b"]);

    after_ms(600).await;
    assert!(backend.answered() >= 2);
    assert_eq!(tracker.progress().current, 2);
    assert_eq!(tracker.progress().completed_ids, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_over_reporting_is_clamped_to_batch() {
    let backend = ScriptedBackend::new([finished(TaskStatus::Completed, 5, 5)]);
    let (tracker, _recorder) = common::tracker(backend);

    tracker.start(prompts(&["a", "b"]), || launched("T1", 5)).await;
    after_ms(1010).await;

    let progress = tracker.progress();
    assert_eq!(progress.current, 5);
    assert_eq!(progress.completed_ids, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_timer_and_in_flight_poll() {
    let backend = ScriptedBackend::new([Step::Delayed(
        Duration::from_millis(800),
        ProgressReport::new(TaskStatus::Completed, 1, 1),
    )]);
    let (tracker, recorder) = common::tracker(backend.clone());
    let updates = tracker.subscribe();

    tracker.start(prompts(&["a"]), || launched("T1", 1)).await;
    after_ms(1100).await;
    assert_eq!(backend.polls(), 1);

    drop(tracker);
    after_ms(5000).await;

    assert_eq!(backend.polls(), 1);
    assert_eq!(backend.answered(), 0);
    assert!(recorder.keys().is_empty());
    assert_eq!(updates.borrow().status, TaskStatus::Running);
    assert!(updates.has_changed().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_each_transition() {
    let backend = ScriptedBackend::new([running(1, 2), finished(TaskStatus::Completed, 2, 2)]);
    let (tracker, _recorder) = common::tracker(backend);
    let mut updates = tracker.subscribe();

    tracker.start(prompts(&["a", "b"]), || launched("T1", 2)).await;
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().status, TaskStatus::Running);

    after_ms(1010).await;
    assert_eq!(updates.borrow_and_update().completed_ids, vec!["a"]);

    after_ms(1000).await;
    assert_eq!(updates.borrow_and_update().status, TaskStatus::Completed);

    after_ms(1500).await;
    assert!(updates.borrow_and_update().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_tracker_is_reusable_after_reset() {
    let backend = ScriptedBackend::new([
        finished(TaskStatus::Completed, 1, 1),
        finished(TaskStatus::Completed, 2, 2),
    ]);
    let (tracker, recorder) = common::tracker(backend.clone());

    tracker.start(prompts(&["a"]), || launched("T1", 1)).await;
    after_ms(2600).await;
    assert!(tracker.progress().is_idle());

    tracker.start(prompts(&["x", "y"]), || launched("T2", 2)).await;
    after_ms(1010).await;
    assert_eq!(tracker.progress().completed_ids, vec!["x", "y"]);
    assert_eq!(
        recorder.keys(),
        vec![MessageKey::Success, MessageKey::Success]
    );
    assert_eq!(backend.polls(), 2);
}
