//! Paths, configuration and logging setup for url2kindle.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{is_email_address, is_kindle_address, Config, Credentials, DEFAULT_SENDER};
pub use error::{CoreError, CoreResult};
pub use logging::{build_logging, debug_enabled, DEBUG_ENV_VAR};
pub use paths::Paths;
