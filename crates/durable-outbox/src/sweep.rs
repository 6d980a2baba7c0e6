//! Sweep coordination: lock admission, triage and retry fan-out.
//!
//! A sweep runs at most once per lock cooldown across all processes sharing
//! the outbox directory. Admission goes through the lock token:
//!
//! 1. a token younger than the cooldown means another sweep ran recently; skip
//! 2. a stale token is removed
//! 3. a new token is created exclusively and stamped with the sweep time;
//!    losing that race to another process also means skip
//!
//! The token is never removed when the sweep finishes. It marks when the
//! last sweep started, which is what the cooldown measures.
//!
//! Stale removal and creation are two steps, so two processes that both see
//! the same stale token can each remove a token and one of them may remove
//! the other's fresh token before creating its own. Both sweeps then run.
//! Retries of the same entry are harmless in that case: deletes are
//! idempotent and a reread of a vanished entry is reported, not failed.

use crate::{
    retry_one, EntryId, OutboxResult, OutboxStore, RetryOutcome, SweepPolicy, Triage,
};
use kindle_delivery_client::Deliver;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Aggregate result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// False when a fresh lock (or a lost lock race) skipped the sweep.
    pub admitted: bool,
    pub expired: usize,
    pub deferred: usize,
    pub dispatched: usize,
    pub delivered: usize,
    pub rejected: usize,
    pub service_errors: usize,
    pub still_pending: usize,
    pub corrupt: usize,
    pub vanished: usize,
    /// Workers that hit a storage error or panicked, plus failed expiries.
    pub failed: usize,
}

impl SweepReport {
    fn skipped() -> Self {
        Self::default()
    }

    fn record(&mut self, outcome: &RetryOutcome) {
        match outcome {
            RetryOutcome::Delivered => self.delivered += 1,
            RetryOutcome::Rejected(_) => self.rejected += 1,
            RetryOutcome::ServiceError { .. } => self.service_errors += 1,
            RetryOutcome::StillPending(_) => self.still_pending += 1,
            RetryOutcome::Corrupt(_) => self.corrupt += 1,
            RetryOutcome::Vanished => self.vanished += 1,
        }
    }
}

/// Runs sweeps over one outbox with one delivery client.
pub struct SweepCoordinator {
    store: Arc<OutboxStore>,
    client: Arc<dyn Deliver>,
    policy: SweepPolicy,
}

impl SweepCoordinator {
    pub fn new(store: Arc<OutboxStore>, client: Arc<dyn Deliver>, policy: SweepPolicy) -> Self {
        Self {
            store,
            client,
            policy,
        }
    }

    /// Sweep using the current wall clock.
    pub async fn sweep(&self) -> OutboxResult<SweepReport> {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep as if the time were `now`.
    ///
    /// Returns only after every dispatched retry has finished. Errors are
    /// limited to admission and listing; per-entry failures are counted in
    /// the report.
    pub async fn sweep_at(&self, now: SystemTime) -> OutboxResult<SweepReport> {
        if !self.admit(now)? {
            return Ok(SweepReport::skipped());
        }

        let mut report = SweepReport {
            admitted: true,
            ..SweepReport::default()
        };
        let mut workers: Vec<(EntryId, JoinHandle<OutboxResult<RetryOutcome>>)> = Vec::new();

        for entry in self.store.list_pending(now)? {
            match self.policy.triage(entry.age) {
                Triage::Expire => match self.store.delete(&entry.id) {
                    Ok(()) => {
                        info!(entry_id = %entry.id, age_secs = entry.age.as_secs(), "Expired outbox entry");
                        report.expired += 1;
                    }
                    Err(err) => {
                        error!(entry_id = %entry.id, error = %err, "Failed to expire outbox entry");
                        report.failed += 1;
                    }
                },
                Triage::Defer => {
                    debug!(entry_id = %entry.id, age_secs = entry.age.as_secs(), "Deferring fresh entry");
                    report.deferred += 1;
                }
                Triage::Retry => {
                    workers.push((entry.id.clone(), self.spawn_retry(entry.id)));
                }
            }
        }
        report.dispatched = workers.len();

        for (id, worker) in workers {
            match worker.await {
                Ok(Ok(outcome)) => report.record(&outcome),
                Ok(Err(err)) => {
                    error!(entry_id = %id, error = %err, "Retry failed on storage");
                    report.failed += 1;
                }
                Err(join_err) => {
                    error!(entry_id = %id, error = %join_err, "Retry worker aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            expired = report.expired,
            deferred = report.deferred,
            dispatched = report.dispatched,
            delivered = report.delivered,
            rejected = report.rejected,
            still_pending = report.still_pending,
            failed = report.failed,
            "Sweep finished"
        );
        Ok(report)
    }

    fn admit(&self, now: SystemTime) -> OutboxResult<bool> {
        if let Some(age) = self.store.lock_age(now)? {
            if self.policy.lock_is_fresh(age) {
                debug!(lock_age_secs = age.as_secs(), "Sweep ran recently, skipping");
                return Ok(false);
            }
            debug!(lock_age_secs = age.as_secs(), "Removing stale sweep lock");
            self.store.remove_lock()?;
        }

        if !self.store.try_create_lock(now)? {
            warn!("Another sweep took the lock, skipping");
            return Ok(false);
        }
        Ok(true)
    }

    fn spawn_retry(&self, id: EntryId) -> JoinHandle<OutboxResult<RetryOutcome>> {
        let store = Arc::clone(&self.store);
        let client = Arc::clone(&self.client);
        let policy = self.policy.clone();
        let span = info_span!("retry", entry_id = %id);

        tokio::spawn(
            async move { retry_one(&store, client.as_ref(), &id, &policy).await }
                .instrument(span)
                .with_current_subscriber(),
        )
    }
}
