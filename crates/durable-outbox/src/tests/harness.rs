//! Test harness for outbox tests.
//!
//! Provides:
//! - ScriptedDelivery: a `Deliver` that answers from a per-URL script
//! - Fixture: a temporary outbox with helpers to age entries and the lock

use crate::{EntryId, OutboxStore, SweepCoordinator, SweepPolicy};
use async_trait::async_trait;
use kindle_delivery_client::{Deliver, DeliveryRequest, Outcome};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::Barrier;

pub const MINUTE: Duration = Duration::from_secs(60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Delivery client answering from a script instead of the network.
pub struct ScriptedDelivery {
    default: Outcome,
    by_url: HashMap<String, Outcome>,
    panic_on: Option<String>,
    barrier: Option<Arc<Barrier>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDelivery {
    pub fn always(outcome: Outcome) -> Self {
        Self {
            default: outcome,
            by_url: HashMap::new(),
            panic_on: None,
            barrier: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `outcome` for `url` instead of the default.
    pub fn with(mut self, url: &str, outcome: Outcome) -> Self {
        self.by_url.insert(url.to_string(), outcome);
        self
    }

    /// Panic inside the attempt for `url`.
    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    /// Make every attempt wait on a shared barrier before answering.
    pub fn rendezvous(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// URLs attempted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deliver for ScriptedDelivery {
    async fn attempt(&self, request: &DeliveryRequest) -> Outcome {
        self.calls.lock().unwrap().push(request.url().to_string());

        if self.panic_on.as_deref() == Some(request.url()) {
            panic!("scripted failure for {}", request.url());
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        self.by_url
            .get(request.url())
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// A temporary outbox with a fixed reference time.
pub struct Fixture {
    pub store: Arc<OutboxStore>,
    pub now: SystemTime,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(OutboxStore::open(dir.path()).unwrap());
        Self {
            store,
            now: SystemTime::now(),
            _dir: dir,
        }
    }

    /// Queue a request for `url` that was written `age` before `now`.
    pub fn queue(&self, url: &str, age: Duration) -> EntryId {
        let id = self
            .store
            .put(&DeliveryRequest::new(
                url,
                "reader@kindle.com",
                "me@example.org",
                "title",
            ))
            .unwrap();
        set_age(&self.store.entry_path(&id), self.now, age);
        id
    }

    /// Write an unparseable record for `url`, aged `age`.
    pub fn queue_corrupt(&self, url: &str, age: Duration) -> EntryId {
        let id = EntryId::for_url(url);
        let path = self.store.entry_path(&id);
        fs::write(&path, "garbage").unwrap();
        set_age(&path, self.now, age);
        id
    }

    /// Leave a lock token that was created `age` before `now`.
    pub fn lock(&self, age: Duration) {
        let path = self.store.lock_path();
        fs::write(&path, "").unwrap();
        set_age(&path, self.now, age);
    }

    pub fn exists(&self, id: &EntryId) -> bool {
        self.store.entry_path(id).exists()
    }

    pub fn lock_age(&self) -> Option<Duration> {
        self.store.lock_age(self.now).unwrap()
    }

    pub fn coordinator(&self, client: Arc<ScriptedDelivery>) -> SweepCoordinator {
        SweepCoordinator::new(Arc::clone(&self.store), client, SweepPolicy::default())
    }

    /// Snapshot of file names and contents in the outbox directory.
    pub fn snapshot(&self) -> Vec<(String, Vec<u8>, SystemTime)> {
        let mut files: Vec<_> = fs::read_dir(self.store.dir())
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let metadata = entry.metadata().unwrap();
                (
                    entry.file_name().into_string().unwrap(),
                    fs::read(entry.path()).unwrap(),
                    metadata.modified().unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    }
}

fn set_age(path: &Path, now: SystemTime, age: Duration) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(now - age)
        .unwrap();
}
