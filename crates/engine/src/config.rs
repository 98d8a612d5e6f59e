//! Store configuration via `skybook.toml`
//!
//! Settings for the search pipeline and the initial filter. A missing key
//! falls back to its default, so an empty file is a valid configuration.

use crate::search::SearchGate;
use serde::{Deserialize, Serialize};
use skybook_core::{FlightFilter, StoreError, StoreResult};
use std::path::Path;
use std::time::Duration;

/// Config file name conventionally used next to the embedding application.
pub const CONFIG_FILE_NAME: &str = "skybook.toml";

/// Default quiet window of the search debouncer, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default minimum origin length accepted by the search gate.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Upper bound for `debounce_ms`.
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Upper bound for `min_query_len`.
pub const MAX_QUERY_LEN: usize = 256;

/// Store configuration loaded from `skybook.toml`.
///
/// # Example
///
/// ```toml
/// debounce_ms = 300
/// min_query_len = 3
/// require_destination = false
///
/// [initial_filter]
/// from = "London"
/// to = "Paris"
/// urgent = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Quiet window before a search input is acted on.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum origin length for a search input to pass the gate.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Reject search inputs without a destination.
    #[serde(default)]
    pub require_destination: bool,
    /// Issue a one-shot load for the initial filter when the store starts.
    #[serde(default)]
    pub load_on_start: bool,
    /// Filter the store starts with.
    #[serde(default)]
    pub initial_filter: FlightFilter,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_min_query_len() -> usize {
    DEFAULT_MIN_QUERY_LEN
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            require_destination: false,
            load_on_start: false,
            initial_filter: FlightFilter::default(),
        }
    }
}

impl StoreConfig {
    /// Debounce quiet window as a `Duration`.
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validity gate built from this config.
    pub fn gate(&self) -> SearchGate {
        SearchGate {
            min_origin_len: self.min_query_len,
            require_destination: self.require_destination,
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if a value is out of range.
    pub fn validate(&self) -> StoreResult<()> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(StoreError::InvalidConfig(format!(
                "debounce_ms = {} exceeds the maximum of {} ms",
                self.debounce_ms, MAX_DEBOUNCE_MS
            )));
        }
        if self.min_query_len > MAX_QUERY_LEN {
            return Err(StoreError::InvalidConfig(format!(
                "min_query_len = {} exceeds the maximum of {}",
                self.min_query_len, MAX_QUERY_LEN
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Skybook booking store configuration
#
# Quiet window in milliseconds: a search input is acted on only after
# this long without newer input (default: 300, maximum: 10000)
debounce_ms = 300

# Minimum origin length for a search input (default: 3)
min_query_len = 3

# Drop search inputs that have no destination (default: false)
require_destination = false

# Load flights for the initial filter when the store starts (default: false)
load_on_start = false

# Filter the store starts with
[initial_filter]
from = "London"
to = "Paris"
urgent = false
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| StoreError::InvalidConfig(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            StoreError::InvalidConfig(msg) => {
                StoreError::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> StoreResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> StoreResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StoreError::InvalidConfig(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
