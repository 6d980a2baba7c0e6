//! First delivery attempt for a new request.

use crate::{EntryId, OutboxResult, OutboxStore};
use kindle_delivery_client::{Deliver, DeliveryRequest, Outcome, RejectReason};
use std::fmt;
use tracing::info;

/// What happened to a request handed to [`send_or_queue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendReport {
    Delivered,
    /// The service was unreachable; the request now waits in the outbox.
    Queued { id: EntryId, reason: String },
    /// The service refused the request. Nothing was stored.
    Rejected(RejectReason),
    /// The service reported an unrecognized failure. Nothing was stored.
    ServiceError { code: String, body: String },
}

impl SendReport {
    /// Delivered and queued requests are both handled; the rest need the
    /// user's attention.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered | Self::Queued { .. })
    }
}

impl fmt::Display for SendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("Sent"),
            Self::Queued { .. } => f.write_str("Network error. Saving url for resend later"),
            Self::Rejected(reason) => write!(f, "{reason}"),
            Self::ServiceError { code, body } if body.is_empty() => {
                write!(f, "X-PushToKindle-Failed: {code}")
            }
            Self::ServiceError { code, body } => {
                write!(f, "X-PushToKindle-Failed: {code}\n{body}")
            }
        }
    }
}

/// Attempt delivery once; on a transient failure persist the request.
///
/// Only a storage failure is an error here: if the request can be neither
/// delivered nor stored, the caller must know.
pub async fn send_or_queue(
    client: &dyn Deliver,
    store: &OutboxStore,
    request: &DeliveryRequest,
) -> OutboxResult<SendReport> {
    let report = match client.attempt(request).await {
        Outcome::Delivered => {
            info!(url = %request.url(), "Sent");
            SendReport::Delivered
        }
        Outcome::RequestRejected(reason) => {
            info!(url = %request.url(), reason = %reason, "Request rejected by service");
            SendReport::Rejected(reason)
        }
        Outcome::ServiceReportedUnknown { code, body } => {
            info!(url = %request.url(), code = %code, body = %body, "Service reported failure");
            SendReport::ServiceError { code, body }
        }
        Outcome::TransientFailure(reason) => {
            info!(url = %request.url(), reason = %reason, "Network error. Saving url for resend later");
            let id = store.put(request)?;
            SendReport::Queued { id, reason }
        }
    };
    Ok(report)
}
