//! RAII scope guard
//!
//! Runs a cleanup closure when the guard leaves scope, including when the
//! enclosing future is dropped mid-await or a panic unwinds through it.
//!
//! # Example
//!
//! ```rust
//! use mediagen_core::guard::ScopeGuard;
//!
//! let mut released = false;
//! {
//!     let _guard = ScopeGuard::new(|| released = true);
//!     // ... early return, `?`, or cancellation all still release ...
//! }
//! assert!(released);
//! ```

/// Guard that runs its cleanup exactly once on drop unless disarmed.
pub struct ScopeGuard<F: FnOnce()> {
    on_drop: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    /// Create a new guard with a cleanup function.
    pub fn new(on_drop: F) -> Self {
        Self {
            on_drop: Some(on_drop),
        }
    }

    /// Consume the guard without running cleanup.
    ///
    /// Call this once the guarded scope has reached a state that no longer
    /// needs unwinding.
    pub fn disarm(mut self) {
        self.on_drop.take();
    }

    /// Run cleanup now and consume the guard.
    pub fn run(mut self) {
        if let Some(cleanup) = self.on_drop.take() {
            cleanup();
        }
    }

    /// Whether the guard will still run its cleanup.
    pub fn is_armed(&self) -> bool {
        self.on_drop.is_some()
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.on_drop.take() {
            cleanup();
        }
    }
}

impl<F: FnOnce()> std::fmt::Debug for ScopeGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("armed", &self.is_armed())
            .finish()
    }
}
