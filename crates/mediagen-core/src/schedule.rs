//! Cancellable scheduled work bound to an owning handle.
//!
//! Every type in this module follows the same ownership rule: the handle
//! returned when work is scheduled is the only way to keep that work alive.
//! Calling `stop`/`cancel`, or simply dropping the handle, aborts the
//! underlying tokio task together with everything it spawned.
//!
//! Aborting is allowed from inside the scheduled work itself. The current
//! tick (or delayed body) keeps running until its next suspension point, so
//! synchronous cleanup that follows the abort still completes.

use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

/// Smallest period accepted by [`RepeatingTimer::start`].
///
/// tokio intervals panic on a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A fixed-period timer that spawns one unit of work per tick.
///
/// The first tick fires one full period after [`RepeatingTimer::start`], not
/// immediately. Each tick's future is spawned onto a task set owned by the
/// timer loop, so a slow tick never delays the next one; ticks may therefore
/// overlap. Stopping the timer aborts the loop and every tick still in flight.
///
/// Missed ticks (for example while the runtime is starved) are skipped rather
/// than replayed in a burst.
///
/// # Examples
///
/// ```rust
/// use mediagen_core::schedule::RepeatingTimer;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let seen = Arc::new(AtomicU64::new(0));
/// let counter = seen.clone();
/// let timer = RepeatingTimer::start(Duration::from_millis(10), move |tick| {
///     let counter = counter.clone();
///     async move {
///         counter.store(tick, Ordering::SeqCst);
///     }
/// });
///
/// tokio::time::sleep(Duration::from_millis(35)).await;
/// drop(timer); // releases the loop
/// assert!(seen.load(Ordering::SeqCst) >= 1);
/// # }
/// ```
#[derive(Debug)]
pub struct RepeatingTimer {
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl RepeatingTimer {
    /// Start a timer that calls `tick` once per `period`.
    ///
    /// `tick` receives a 1-based tick counter. Periods below [`MIN_PERIOD`]
    /// are raised to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Dropped with this future, which aborts every tick in flight.
            let mut in_flight = JoinSet::new();
            let mut count: u64 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        count += 1;
                        in_flight.spawn(tick(count));
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(_err) = joined {
                            #[cfg(feature = "tracing")]
                            if _err.is_panic() {
                                tracing::error!(error = %_err, "Timer tick panicked");
                            }
                        }
                    }
                }
            }
        });

        Self {
            handle: Some(handle),
            period,
        }
    }

    /// Stop the timer and abort all in-flight ticks.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();

            #[cfg(feature = "tracing")]
            tracing::trace!(period_ms = self.period.as_millis() as u64, "Timer stopped");
        }
    }

    /// Whether the timer loop is still scheduled.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// The effective tick period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A single unit of work that runs after a delay unless cancelled first.
#[derive(Debug)]
pub struct DelayedTask {
    handle: Option<JoinHandle<()>>,
}

impl DelayedTask {
    /// Run `work` once `delay` has elapsed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<Fut>(delay: Duration, work: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            work.await;
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Cancel the work if it has not run yet. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the work is still waiting or running.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
