//! Durable outbox for Kindle deliveries.
//!
//! This crate provides:
//! - [`OutboxStore`]: content-addressed, file-backed storage of pending requests
//! - [`send_or_queue`]: the first delivery attempt, persisting on transient failure
//! - [`SweepCoordinator`]: lock admission, age triage and concurrent retries
//! - [`retry_one`]: a single retry attempt and the store reconciliation after it
//!
//! ```text
//! caller ──▶ send_or_queue ──▶ Deliver::attempt
//!                 │ transient
//!                 ▼
//!           OutboxStore::put
//!
//! caller ──▶ SweepCoordinator::sweep ──▶ triage ──▶ retry_one (one task per entry)
//!                                                      │
//!                                   Deliver::attempt ◀─┘──▶ delete / leave
//! ```

mod error;
mod policy;
mod send;
mod store;
mod sweep;
mod worker;

#[cfg(test)]
mod tests;

pub use error::{OutboxError, OutboxResult};
pub use policy::{SweepPolicy, Triage};
pub use send::{send_or_queue, SendReport};
pub use store::{EntryId, OutboxStore, PendingEntry, LOCK_TOKEN_NAME};
pub use sweep::{SweepCoordinator, SweepReport};
pub use worker::{retry_one, RetryOutcome};
