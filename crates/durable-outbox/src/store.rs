//! File-backed outbox storage.
//!
//! One file per pending request, named by the BLAKE2s digest of its URL, so
//! a second failure for the same URL overwrites the first entry instead of
//! queueing a duplicate. A record is four newline-terminated lines:
//! `url`, `recipient_email`, `sender_email`, `title`.
//!
//! The entry's age is the file's modification time; nothing else is stored.
//! The sweep lock token lives in the same directory under [`LOCK_TOKEN_NAME`].

use crate::{OutboxError, OutboxResult};
use blake2::{Blake2s256, Digest};
use kindle_delivery_client::DeliveryRequest;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Reserved name of the sweep lock token.
pub const LOCK_TOKEN_NAME: &str = "LOCK";

/// Hex length of a BLAKE2s-256 digest.
const ENTRY_ID_LEN: usize = 64;

/// Number of fields in a record.
const RECORD_FIELDS: usize = 4;

/// Storage identity of an entry: lowercase hex BLAKE2s-256 of the URL bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(String);

impl EntryId {
    pub fn for_url(url: &str) -> Self {
        Self(hex::encode(Blake2s256::digest(url.as_bytes())))
    }

    /// Accept a file name only if it is a well-formed digest.
    pub fn parse(name: &str) -> Option<Self> {
        let well_formed = name.len() == ENTRY_ID_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pending entry as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: EntryId,
    /// Time since the entry was last written.
    pub age: Duration,
}

/// The outbox directory.
#[derive(Debug, Clone)]
pub struct OutboxStore {
    dir: PathBuf,
}

impl OutboxStore {
    /// Open (creating if needed) the outbox at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> OutboxResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `id`.
    pub fn entry_path(&self, id: &EntryId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Path of the sweep lock token.
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_TOKEN_NAME)
    }

    /// Write or overwrite the entry for `request.url()`.
    ///
    /// The record is written to a temporary file and renamed into place, so
    /// readers see either the old record, the new one, or nothing.
    pub fn put(&self, request: &DeliveryRequest) -> OutboxResult<EntryId> {
        let id = EntryId::for_url(request.url());
        let record = encode_record(request)?;
        atomic_write(&self.dir, &self.entry_path(&id), record.as_bytes())?;
        debug!(entry_id = %id, url = %request.url(), "Saved outbox entry");
        Ok(id)
    }

    /// Read and parse an entry.
    pub fn get(&self, id: &EntryId) -> OutboxResult<DeliveryRequest> {
        let bytes = match fs::read(self.entry_path(id)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(OutboxError::NotFound(id.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        let text = String::from_utf8(bytes).map_err(|_| OutboxError::CorruptEntry {
            id: id.clone(),
            reason: "record is not valid UTF-8".to_string(),
        })?;
        decode_record(id, &text)
    }

    /// Remove an entry. Removing an absent entry is not an error.
    pub fn delete(&self, id: &EntryId) -> OutboxResult<()> {
        remove_if_present(&self.entry_path(id))?;
        debug!(entry_id = %id, "Deleted outbox entry");
        Ok(())
    }

    /// Snapshot of all entries with their age relative to `now`.
    ///
    /// Only digest-named files are entries; the lock token, temporaries and
    /// anything else in the directory are ignored. Sorted by id.
    pub fn list_pending(&self, now: SystemTime) -> OutboxResult<Vec<PendingEntry>> {
        let mut pending = Vec::new();

        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let Some(id) = dir_entry.file_name().to_str().and_then(EntryId::parse) else {
                continue;
            };

            let metadata = match dir_entry.metadata() {
                Ok(metadata) => metadata,
                // Deleted between read_dir and stat.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            if !metadata.is_file() {
                warn!(entry_id = %id, "Ignoring non-file in outbox directory");
                continue;
            }

            pending.push(PendingEntry {
                id,
                age: age_at(metadata.modified()?, now),
            });
        }

        pending.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pending)
    }

    /// Age of the lock token, or `None` if there is none.
    pub fn lock_age(&self, now: SystemTime) -> OutboxResult<Option<Duration>> {
        match fs::metadata(self.lock_path()) {
            Ok(metadata) => Ok(Some(age_at(metadata.modified()?, now))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove the lock token if present.
    pub fn remove_lock(&self) -> OutboxResult<()> {
        remove_if_present(&self.lock_path())
    }

    /// Create the lock token stamped with `now`.
    ///
    /// Creation is exclusive: returns `false` when a token already exists,
    /// i.e. another sweep created one since the caller last looked.
    pub fn try_create_lock(&self, now: SystemTime) -> OutboxResult<bool> {
        let file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.lock_path())
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        file.set_modified(now)?;
        Ok(true)
    }
}

fn age_at(modified: SystemTime, now: SystemTime) -> Duration {
    // Files stamped in the future count as brand new.
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}

fn remove_if_present(path: &Path) -> OutboxResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn encode_record(request: &DeliveryRequest) -> OutboxResult<String> {
    let fields = [
        ("url", request.url()),
        ("recipient_email", request.recipient_email()),
        ("sender_email", request.sender_email()),
        ("title", request.title()),
    ];

    let mut record = String::new();
    for (field, value) in fields {
        if value.contains(['\n', '\r']) {
            return Err(OutboxError::UnencodableField { field });
        }
        record.push_str(value);
        record.push('\n');
    }
    Ok(record)
}

fn decode_record(id: &EntryId, text: &str) -> OutboxResult<DeliveryRequest> {
    let fields: Vec<&str> = text.lines().take(RECORD_FIELDS).collect();
    if fields.len() < RECORD_FIELDS {
        return Err(OutboxError::CorruptEntry {
            id: id.clone(),
            reason: format!("expected {RECORD_FIELDS} fields, found {}", fields.len()),
        });
    }
    if fields[0].is_empty() {
        return Err(OutboxError::CorruptEntry {
            id: id.clone(),
            reason: "empty url".to_string(),
        });
    }
    Ok(DeliveryRequest::new(fields[0], fields[1], fields[2], fields[3]))
}

/// Write `contents` to `path` through a temporary file in `dir`.
fn atomic_write(dir: &Path, path: &Path, contents: &[u8]) -> OutboxResult<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}.{}",
        file_name,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let write_result = (|| -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        if let Ok(parent_dir) = fs::File::open(dir) {
            let _ = parent_dir.sync_all();
        }
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}
