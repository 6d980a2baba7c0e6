//! # Observability
//!
//! Logging layer for url2kindle.
//!
//! Components are **log producers** only. They use the standard `tracing`
//! macros and never configure output themselves. The binary builds a
//! [`LogHandle`] once, explicitly, and installs it before doing any work:
//!
//! - structured JSONL lines go to a log file (rotated by size on open)
//! - a terse, message-only copy of important events goes to stderr
//!
//! ## Usage
//!
//! ```rust,ignore
//! let handle = observability::build(&observability::LogConfig {
//!     service_name: "u2k".into(),
//!     log_path: paths.log_file(),
//!     ..Default::default()
//! })?;
//! handle.install()?;
//!
//! tracing::info!("ready");
//! ```
//!
//! Nothing here is initialised lazily. Code that spawns tasks should carry
//! the current dispatcher along (see [`tracing::instrument::WithSubscriber`]).

mod file;
mod json_layer;

use std::io;
use std::path::{Path, PathBuf};

use tracing::dispatcher::SetGlobalDefaultError;
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::{RotatingLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Rotate the log file once it grows past this size.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Number of rotated log files kept next to the live one.
pub const DEFAULT_BACKUPS: usize = 3;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSONL line.
    pub service_name: String,

    /// Filter for the log file (e.g. "info", "debug").
    /// `RUST_LOG` overrides it when set.
    pub file_level: String,

    /// Filter for stderr output. `None` disables stderr entirely.
    pub stderr_level: Option<String>,

    /// Where the JSONL log lives.
    pub log_path: PathBuf,

    /// Size threshold that triggers rotation when the file is opened.
    pub max_file_bytes: u64,

    /// How many rotated files to keep (`u2k.log.1` .. `u2k.log.N`).
    pub backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            file_level: "info".into(),
            stderr_level: Some("warn".into()),
            log_path: PathBuf::from("u2k.log"),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            backups: DEFAULT_BACKUPS,
        }
    }
}

/// An explicitly constructed logging pipeline.
///
/// Holding the handle does not make it active; call [`LogHandle::install`]
/// to make it the process-wide default, or use
/// [`tracing::dispatcher::with_default`] to scope it.
#[derive(Clone)]
pub struct LogHandle {
    dispatch: Dispatch,
    log_path: PathBuf,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

impl LogHandle {
    /// The dispatcher carrying the configured layers.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Path of the JSONL log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Install as the global default dispatcher.
    ///
    /// Fails if another dispatcher was already installed.
    pub fn install(&self) -> Result<(), SetGlobalDefaultError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())?;
        tracing::debug!(log_path = %self.log_path.display(), "observability initialized");
        Ok(())
    }
}

/// Build the logging pipeline described by `config`.
///
/// Opens (and if needed rotates) the log file, creating parent directories.
pub fn build(config: &LogConfig) -> io::Result<LogHandle> {
    let writer = RotatingLogWriter::open(&config.log_path, config.max_file_bytes, config.backups)?;
    let json_layer = JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer));

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.file_level));

    // Plain messages on stderr, the JSONL file keeps the detail.
    let stderr_layer = config.stderr_level.as_ref().map(|level| {
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_level(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(EnvFilter::new(level))
    });

    let subscriber = tracing_subscriber::registry()
        .with(json_layer.with_filter(file_filter))
        .with(stderr_layer);

    Ok(LogHandle {
        dispatch: Dispatch::new(subscriber),
        log_path: config.log_path.clone(),
    })
}
