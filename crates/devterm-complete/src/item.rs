use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Command,
    Variable,
    Function,
    Keyword,
    Snippet,
}

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    History,
    Custom,
    Builtin,
    Environment,
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCompleteItem {
    /// Text inserted when the item is applied.
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub score: f64,
    pub source: ItemSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AutoCompleteItem {
    pub(crate) fn new(
        value: impl Into<String>,
        kind: ItemType,
        source: ItemSource,
        score: f64,
    ) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
            description: None,
            kind,
            score,
            source,
            metadata: None,
        }
    }

    pub(crate) fn described(mut self, description: &str) -> Self {
        if !description.is_empty() {
            self.description = Some(description.to_string());
        }
        self
    }

    pub(crate) fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
