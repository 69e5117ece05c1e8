//! Common test utilities and helpers

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mediagen::{
    Error, GenerationPrompt, GenerationTracker, MessageKey, Notification, ProgressReport, Result,
    TaskBackend, TaskStatus, TrackerConfig, async_trait,
};

/// Load a response fixture
#[allow(dead_code)]
pub fn load_response_fixture(name: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("fixtures")
        .join("responses")
        .join(format!("{}.json", name));

    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to load response fixture '{}' from {:?}: {}",
            name, path, e
        )
    })
}

/// Create a test API token
#[allow(dead_code)]
pub fn test_api_token() -> String {
    "mg-test-token-0123456789".to_string()
}

/// Prompts with the given ids, in order
#[allow(dead_code)]
pub fn prompts(ids: &[&str]) -> Vec<GenerationPrompt> {
    ids.iter()
        .map(|id| GenerationPrompt::new(*id, format!("prompt for {id}")))
        .collect()
}

/// One scripted answer to a progress query
#[allow(dead_code)]
pub enum Step {
    /// Answer immediately
    Report(ProgressReport),
    /// Answer after a delay
    Delayed(Duration, ProgressReport),
    /// Fail with a connection error
    Fail(&'static str),
}

/// In-memory backend that answers progress queries from a script.
///
/// Once the script is exhausted the last report is repeated.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<ProgressReport>>,
    polls: AtomicUsize,
    answered: AtomicUsize,
    cancelled: Mutex<Vec<String>>,
    cancel_error: Mutex<Option<&'static str>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        })
    }

    /// Make every cancel request fail
    pub fn failing_cancel(self: Arc<Self>, message: &'static str) -> Arc<Self> {
        *self.cancel_error.lock().unwrap() = Some(message);
        self
    }

    /// Progress queries issued
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Progress queries that produced an answer
    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }

    /// Task ids passed to cancel
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskBackend for ScriptedBackend {
    async fn progress(&self, _task_id: &str) -> Result<ProgressReport> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        let step = self.script.lock().unwrap().pop_front();
        let report = match step {
            Some(Step::Report(report)) => report,
            Some(Step::Delayed(delay, report)) => {
                tokio::time::sleep(delay).await;
                report
            }
            Some(Step::Fail(message)) => {
                self.answered.fetch_add(1, Ordering::SeqCst);
                return Err(Error::Connection(message.to_string()));
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| ProgressReport::new(TaskStatus::Running, 0, 0)),
        };

        *self.last.lock().unwrap() = Some(report.clone());
        self.answered.fetch_add(1, Ordering::SeqCst);
        Ok(report)
    }

    async fn cancel(&self, task_id: &str) -> Result<()> {
        if let Some(message) = *self.cancel_error.lock().unwrap() {
            return Err(Error::Connection(message.to_string()));
        }
        self.cancelled.lock().unwrap().push(task_id.to_string());
        Ok(())
    }
}

/// Collects notifications delivered to a tracker
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Notification>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn notifier(&self) -> impl Fn(Notification) + Send + Sync + 'static {
        let seen = self.seen.clone();
        move |n| seen.lock().unwrap().push(n)
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<MessageKey> {
        self.seen.lock().unwrap().iter().map(|n| n.key).collect()
    }
}

/// Tracker with default timing (1s poll, 1.5s reset) over a scripted backend
#[allow(dead_code)]
pub fn tracker(
    backend: Arc<ScriptedBackend>,
) -> (GenerationTracker<Arc<ScriptedBackend>>, Recorder) {
    let recorder = Recorder::default();
    let tracker = GenerationTracker::builder(backend)
        .config(TrackerConfig::default())
        .notifier(recorder.notifier())
        .build()
        .expect("default tracker config is valid");
    (tracker, recorder)
}

/// Install a test subscriber once; later calls are no-ops
#[allow(dead_code)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
