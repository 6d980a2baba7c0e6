//! Configuration file and delivery address validation.

use crate::{CoreError, CoreResult, Paths};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Sender address used when none (or an invalid one) is configured.
pub const DEFAULT_SENDER: &str = "kindle@fivefilters.org";

fn kindle_regex() -> &'static Regex {
    static KINDLE: OnceLock<Regex> = OnceLock::new();
    KINDLE.get_or_init(|| Regex::new(r"^[^@]+@kindle\.com$").expect("valid kindle regex"))
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("valid email regex"))
}

/// Whether `address` looks like a Kindle delivery address (`name@kindle.com`).
pub fn is_kindle_address(address: &str) -> bool {
    kindle_regex().is_match(address)
}

/// Whether `address` looks like an ordinary email address.
pub fn is_email_address(address: &str) -> bool {
    email_regex().is_match(address)
}

/// Persisted user configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Kindle delivery address.
    #[serde(default)]
    pub email: String,
    /// Address the service sends from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Validated addresses handed to the delivery client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub recipient_email: String,
    pub sender_email: String,
}

impl Config {
    pub fn new(email: impl Into<String>, from: Option<String>) -> Self {
        Self {
            email: email.into(),
            from,
        }
    }

    /// Load the configuration file.
    ///
    /// Returns `Ok(None)` when no file exists yet, so the caller can prompt.
    pub fn load(paths: &Paths) -> CoreResult<Option<Self>> {
        let config_path = paths.config_file();
        if !config_path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&config_path).map(Some)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        if config.email.trim().is_empty() {
            return Err(CoreError::Config(
                "Kindle email address not found in configuration file".to_string(),
            ));
        }
        Ok(config)
    }

    /// Save configuration to the config file, creating its directory.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        std::fs::create_dir_all(paths.config_dir())?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        info!(
            path = %config_path.display(),
            email = %self.email,
            from = self.from.as_deref().unwrap_or(""),
            "Saved config file"
        );
        Ok(())
    }

    /// Check the addresses.
    ///
    /// An invalid Kindle address is an error. A missing or invalid sender
    /// falls back to [`DEFAULT_SENDER`].
    pub fn validate(&self) -> CoreResult<Credentials> {
        let email = self.email.trim();
        if !is_kindle_address(email) {
            return Err(CoreError::Config(format!(
                "Invalid Kindle email address: {email}"
            )));
        }

        let sender_email = match self.from.as_deref().map(str::trim) {
            Some(from) if is_email_address(from) => from.to_string(),
            Some(from) => {
                warn!(
                    "Invalid 'from' email address: {from}\nFalling back to default: {DEFAULT_SENDER}"
                );
                DEFAULT_SENDER.to_string()
            }
            None => DEFAULT_SENDER.to_string(),
        };

        Ok(Credentials {
            recipient_email: email.to_string(),
            sender_email,
        })
    }
}
