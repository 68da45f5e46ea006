use serde::{Deserialize, Serialize};

/// One recorded command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub command: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Wall-clock milliseconds the command took.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Optional details recorded alongside a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryMeta {
    pub execution_time: Option<u64>,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl HistoryMeta {
    pub fn success(execution_time: u64, output: impl Into<String>) -> Self {
        Self {
            execution_time: Some(execution_time),
            exit_code: Some(0),
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(execution_time: u64, error: impl Into<String>) -> Self {
        Self {
            execution_time: Some(execution_time),
            exit_code: Some(1),
            output: None,
            error: Some(error.into()),
        }
    }
}
