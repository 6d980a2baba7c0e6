//! Logging setup for the `u2k` binary.
//!
//! Builds the observability pipeline: JSONL to `<cache>/u2k.log`, terse
//! messages on stderr. Setting `U2K_DEBUG` turns both outputs up to debug.

use crate::{CoreError, CoreResult, Paths};
use observability::{LogConfig, LogHandle};

/// Environment variable that enables debug output.
pub const DEBUG_ENV_VAR: &str = "U2K_DEBUG";

/// Whether debug logging was requested through the environment.
pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV_VAR)
        .map(|raw| !raw.trim().is_empty())
        .unwrap_or(false)
}

/// Build (but do not install) the logging pipeline.
///
/// `level` overrides both the file and the stderr filter when given.
pub fn build_logging(paths: &Paths, level: Option<&str>) -> CoreResult<LogHandle> {
    let config = log_config(paths, level, debug_enabled());
    observability::build(&config).map_err(CoreError::from)
}

fn log_config(paths: &Paths, level: Option<&str>, debug: bool) -> LogConfig {
    let (file_level, stderr_level) = match (level, debug) {
        (Some(level), _) => (level, level),
        (None, true) => ("debug", "debug"),
        (None, false) => ("info", "warn"),
    };

    LogConfig {
        service_name: "u2k".into(),
        file_level: file_level.into(),
        stderr_level: Some(stderr_level.into()),
        log_path: paths.log_file(),
        ..Default::default()
    }
}
