//! Terminal output entries.
//!
//! An [`OutputEntry`] is one line (or block) of terminal output as the
//! rendering layer receives it. Entries are immutable once emitted and are
//! appended to the log of the tab that produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::{new_id, now_ms};

/// Severity/role of an output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLevel {
    Success,
    Error,
    Warning,
    Info,
    System,
    Debug,
}

impl OutputLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::System => "system",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted line of terminal output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntry {
    pub id: String,
    pub level: OutputLevel,
    pub message: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl OutputEntry {
    /// Create an entry stamped with a fresh id and the current time.
    pub fn new(level: OutputLevel, message: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            level,
            message: message.into(),
            timestamp: now_ms(),
            metadata: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutputLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(OutputLevel::Info, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(OutputLevel::System, message)
    }

    /// Attach a metadata object.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Read a string field out of the metadata object.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&OutputLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn entry_without_metadata_omits_field() {
        let e = OutputEntry::info("hello");
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["level"], "info");
        assert_eq!(json["message"], "hello");
    }

    #[test]
    fn metadata_lookup() {
        let e = OutputEntry::system("clear")
            .with_metadata(serde_json::json!({ "action": "clear" }));
        assert_eq!(e.metadata_str("action"), Some("clear"));
        assert_eq!(e.metadata_str("missing"), None);
    }
}
