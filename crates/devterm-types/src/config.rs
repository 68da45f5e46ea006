//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty document (or a missing file) yields
//! a working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DevtermError, Result};

/// Lower bound for the history capacity.
pub const MIN_HISTORY: usize = 10;
/// Upper bound for the history capacity.
pub const MAX_HISTORY: usize = 10_000;

/// Top-level configuration (`devterm.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub autocomplete: AutocompleteConfig,
    #[serde(default)]
    pub syntax: SyntaxConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Ring-buffer bound, clamped to `MIN_HISTORY..=MAX_HISTORY`.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteConfig {
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// How many de-duplicated history commands feed the ranker.
    #[serde(default = "default_recent_history")]
    pub recent_history: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Await each command's declared latency (installs, builds, test runs).
    #[serde(default)]
    pub simulate_latency: bool,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_blocked_commands")]
    pub blocked_commands: Vec<String>,
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,
}

fn default_max_entries() -> usize {
    1_000
}
fn default_max_suggestions() -> usize {
    10
}
fn default_recent_history() -> usize {
    20
}
fn default_cache_capacity() -> usize {
    100
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_user() -> String {
    "developer".to_string()
}
fn default_hostname() -> String {
    "devterm".to_string()
}
fn default_blocked_commands() -> Vec<String> {
    ["sudo", "su", "shutdown", "reboot", "mkfs", "dd"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_blocked_patterns() -> Vec<String> {
    [
        r"rm\s+-(rf|fr)\s+/(\s|$|\*)",
        r":\(\)\s*\{\s*:\|:&\s*\};:",
        r"(curl|wget)\s+[^|]*\|\s*(sudo\s+)?(ba|z)?sh\b",
        r">\s*/dev/sd[a-z]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            recent_history: default_recent_history(),
        }
    }
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_timeout_ms(),
            simulate_latency: false,
            user: default_user(),
            hostname: default_hostname(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            blocked_commands: default_blocked_commands(),
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

impl DispatcherConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Clamp soft limits and reject values the engine cannot run with.
    pub fn validate(&mut self) -> Result<()> {
        let requested = self.history.max_entries;
        self.history.max_entries = requested.clamp(MIN_HISTORY, MAX_HISTORY);
        if requested != self.history.max_entries {
            log::warn!(
                "history.max_entries {requested} out of range, using {}",
                self.history.max_entries
            );
        }
        if self.autocomplete.max_suggestions == 0 {
            return Err(DevtermError::Config(
                "autocomplete.max_suggestions must be at least 1".to_string(),
            ));
        }
        if self.syntax.cache_capacity == 0 {
            return Err(DevtermError::Config(
                "syntax.cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.command_timeout_ms == 0 {
            return Err(DevtermError::Config(
                "dispatcher.command_timeout_ms must be positive".to_string(),
            ));
        }
        for pattern in &self.security.blocked_patterns {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }
}
