//! Delivery client error types.

use thiserror::Error;

/// Errors raised while setting up the client.
///
/// Failed attempts are not errors; they are [`crate::Outcome`]s.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
