#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core runtime primitives for the mediagen crates.
//!
//! This crate owns the pieces of the client that deal with time and scope
//! rather than with HTTP:
//!
//! - **Scheduled work** via [`RepeatingTimer`](schedule::RepeatingTimer) and
//!   [`DelayedTask`](schedule::DelayedTask). Both are handles that own their
//!   spawned work; dropping a handle releases it.
//! - **Deterministic scope exit** via [`ScopeGuard`](guard::ScopeGuard), which
//!   runs a cleanup closure on every exit path unless it is disarmed.
//!
//! # Examples
//!
//! ```rust
//! use mediagen_core::prelude::*;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut timer = RepeatingTimer::start(Duration::from_secs(1), |tick| async move {
//!     println!("tick {tick}");
//! });
//! assert!(timer.is_active());
//! timer.stop();
//! assert!(!timer.is_active());
//! # }
//! ```

pub mod guard;
pub mod schedule;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use mediagen_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::guard::ScopeGuard;
    pub use crate::schedule::{DelayedTask, RepeatingTimer};
}
