//! Delivery client for the Push to Kindle service.
//!
//! This crate provides:
//! - [`DeliveryRequest`]: the immutable "send this URL" value
//! - [`Outcome`]: the closed classification of one delivery attempt
//! - [`Deliver`]: the seam the outbox retries through
//! - [`PushToKindleClient`]: the HTTP implementation

mod client;
mod error;
mod outcome;
mod request;

#[cfg(test)]
mod mock_service;

pub use client::{
    PushToKindleClient, SenderConfig, DEFAULT_SERVICE_URL, FAILURE_HEADER, INVALID_URL_BODY,
    SERVICE_URL_ENV_VAR,
};
pub use error::{DeliveryError, DeliveryResult};
pub use outcome::{classify_response, Outcome, RejectReason};
pub use request::DeliveryRequest;

use async_trait::async_trait;

/// Performs a single delivery attempt.
///
/// Implementations never retry on their own and never touch local state;
/// every failure is reported through the returned [`Outcome`].
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn attempt(&self, request: &DeliveryRequest) -> Outcome;
}
