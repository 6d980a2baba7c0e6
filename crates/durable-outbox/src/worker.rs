//! One retry of one outbox entry.

use crate::{EntryId, OutboxError, OutboxResult, OutboxStore, SweepPolicy};
use kindle_delivery_client::{Deliver, Outcome, RejectReason};
use tracing::{debug, info, warn};

/// How a retry ended, after the store was reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Sent; entry deleted.
    Delivered,
    /// Refused by the service; entry deleted.
    Rejected(RejectReason),
    /// Unrecognized failure code. `discarded` tells whether the entry went.
    ServiceError { code: String, discarded: bool },
    /// Still unreachable; entry left unchanged.
    StillPending(String),
    /// Entry could not be parsed; deleted.
    Corrupt(String),
    /// Entry disappeared before it could be read.
    Vanished,
}

/// Read `id`, attempt delivery and delete or keep the entry accordingly.
///
/// Errors are storage failures only; every delivery outcome maps to a
/// [`RetryOutcome`].
pub async fn retry_one(
    store: &OutboxStore,
    client: &dyn Deliver,
    id: &EntryId,
    policy: &SweepPolicy,
) -> OutboxResult<RetryOutcome> {
    let request = match store.get(id) {
        Ok(request) => request,
        Err(OutboxError::NotFound(_)) => {
            debug!(entry_id = %id, "Entry already gone");
            return Ok(RetryOutcome::Vanished);
        }
        Err(OutboxError::CorruptEntry { reason, .. }) => {
            warn!(entry_id = %id, reason = %reason, "Discarding corrupt entry");
            store.delete(id)?;
            return Ok(RetryOutcome::Corrupt(reason));
        }
        Err(err) => return Err(err),
    };

    info!(url = %request.url(), "Trying to resend url");

    let outcome = match client.attempt(&request).await {
        Outcome::Delivered => {
            info!(url = %request.url(), "Resent");
            store.delete(id)?;
            RetryOutcome::Delivered
        }
        Outcome::RequestRejected(reason) => {
            warn!(url = %request.url(), reason = %reason, "Dropping rejected url");
            store.delete(id)?;
            RetryOutcome::Rejected(reason)
        }
        Outcome::ServiceReportedUnknown { code, body } => {
            let discarded = policy.discard_on_service_error;
            warn!(
                url = %request.url(),
                code = %code,
                body = %body,
                discarded,
                "Service reported failure on resend"
            );
            if discarded {
                store.delete(id)?;
            }
            RetryOutcome::ServiceError { code, discarded }
        }
        Outcome::TransientFailure(reason) => {
            info!(url = %request.url(), reason = %reason, "Resend failed, keeping url");
            RetryOutcome::StillPending(reason)
        }
    };

    Ok(outcome)
}
