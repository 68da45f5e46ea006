//! Error types for devterm.

use std::io;
use std::time::Duration;

/// Errors produced by the devterm engine.
#[derive(Debug, thiserror::Error)]
pub enum DevtermError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("blocked by security policy: {0}")]
    SecurityRejection(String),

    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("{0}")]
    Command(String),

    #[error("command timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("import rejected: {0}")]
    ImportValidation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl DevtermError {
    /// Shorthand for a usage error built from a usage string.
    pub fn usage(usage: &str) -> Self {
        Self::Usage(usage.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DevtermError>;
