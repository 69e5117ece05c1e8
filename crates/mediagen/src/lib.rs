//! # mediagen
//!
//! Async client for batch media generation backends (image, audio and video
//! rendering) supporting:
//! - Launching image and audio batches
//! - Progress polling and cancellation
//! - A generation task tracker that reconciles backend progress with the
//!   submitted prompts and resets itself on every terminal path
//! - Bearer authentication and bounded retries for idempotent requests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediagen::{Client, GenerateAudioParams, AudioSettings, GenerationPrompt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("http://localhost:8000");
//!     let tracker = client.tracker();
//!
//!     let prompts = vec![GenerationPrompt::new("span_1", "Once upon a time")];
//!     let params = GenerateAudioParams::builder()
//!         .project_name("novel")
//!         .chapter_name("chapter_1")
//!         .audio_settings(AudioSettings::new("narrator", "+0%"))
//!         .prompts(prompts.clone())
//!         .build()?;
//!
//!     let media = client.media();
//!     let outcome = tracker
//!         .start(prompts, || async move { media.generate_audio(&params).await })
//!         .await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, TrackerConfig};
pub use error::{Error, Result};
pub use tracker::{
    GenerationTracker, GenerationTrackerBuilder, MessageKey, Notification, NotificationLevel,
    Notifier, RejectReason, StartOutcome, TaskBackend, TracingNotifier,
};
pub use types::*;

// Module declarations
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod resources;
pub mod tracker;
pub mod types;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use mediagen::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Client, ClientConfig, Error, Result,
        tracker::{GenerationTracker, Notification, Notifier, StartOutcome, TaskBackend},
        types::{GenerationProgress, GenerationPrompt, ProgressReport, TaskStatus},
    };
}

/// SDK version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
