//! Scenario tests for the outbox sweep.
//!
//! - `harness.rs`     - scripted delivery client and outbox fixtures
//! - `admission.rs`   - lock cooldown, stale lock takeover, lost lock race
//! - `triage.rs`      - expiry, quiet window, retry eligibility
//! - `reconcile.rs`   - store state after each retry outcome
//! - `concurrency.rs` - parallel workers, fault isolation, completion

pub(crate) mod harness;
