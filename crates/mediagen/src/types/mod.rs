//! Wire and state types for the generation backend
//!
//! Launch parameters, progress reports and the task status enumeration shared
//! by the media resource and the generation tracker.

pub use media::*;
pub use progress::*;
pub use prompt::*;
pub use status::*;

pub mod media;
pub mod progress;
pub mod prompt;
pub mod status;
