//! Log file output.
//!
//! Appends JSONL lines to a single file, flushing after every line so a
//! crash or a sibling process never sees a half-written record. The file is
//! rotated by size when it is opened; a short-lived CLI never needs to rotate
//! mid-run.

use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Line-flushed, append-only log file writer.
#[derive(Clone)]
pub struct RotatingLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl RotatingLogWriter {
    /// Open `path` for appending, rotating it first if it has reached
    /// `max_bytes`. Parent directories are created as needed.
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        rotate_if_needed(path, max_bytes, backups)?;

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for RotatingLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber
#[derive(Clone)]
pub struct WriterFactory {
    writer: RotatingLogWriter,
}

impl WriterFactory {
    pub fn new(writer: RotatingLogWriter) -> Self {
        Self { writer }
    }
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = RotatingLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}

/// Shift `path` -> `path.1` -> ... -> `path.N` once `path` is too large.
/// The oldest backup is overwritten.
fn rotate_if_needed(path: &Path, max_bytes: u64, backups: usize) -> io::Result<()> {
    let len = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if len < max_bytes {
        return Ok(());
    }

    if backups == 0 {
        return fs::remove_file(path);
    }

    for index in (1..backups).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
