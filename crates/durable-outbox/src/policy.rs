//! Sweep timing policy.

use std::time::Duration;

/// Minimum time between two admitted sweeps.
pub const DEFAULT_LOCK_COOLDOWN: Duration = Duration::from_secs(600);

/// Entries younger than this are left for a later sweep.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_secs(300);

/// Entries at least this old are discarded without a retry.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// What a sweep does with one entry, decided from its age alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    /// Too old to be worth delivering; delete.
    Expire,
    /// Just queued; leave it for a later sweep.
    Defer,
    /// Dispatch a retry now.
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPolicy {
    pub lock_cooldown: Duration,
    pub quiet_window: Duration,
    pub expiry: Duration,
    /// Delete entries whose retry ends in an unrecognized service failure
    /// code. When false they stay queued until they expire.
    pub discard_on_service_error: bool,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            lock_cooldown: DEFAULT_LOCK_COOLDOWN,
            quiet_window: DEFAULT_QUIET_WINDOW,
            expiry: DEFAULT_EXPIRY,
            discard_on_service_error: true,
        }
    }
}

impl SweepPolicy {
    /// Expiry wins over the quiet window; the boundaries are inclusive on
    /// the older side.
    pub fn triage(&self, age: Duration) -> Triage {
        if age >= self.expiry {
            Triage::Expire
        } else if age < self.quiet_window {
            Triage::Defer
        } else {
            Triage::Retry
        }
    }

    /// Whether an existing lock of `age` still blocks a new sweep.
    pub fn lock_is_fresh(&self, age: Duration) -> bool {
        age < self.lock_cooldown
    }
}
