//! API resource endpoints
//!
//! Each resource borrows the [`Client`]'s transport and exposes one group of
//! backend endpoints.

pub mod media;

pub use media::Media;

use crate::client::Client;

/// Base trait for API resources.
pub trait Resource {
    /// Get a reference to the client.
    fn client(&self) -> &Client;
}
