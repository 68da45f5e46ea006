use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Token categories, in their highlighting priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Keyword,
    String,
    Number,
    Comment,
    Function,
    Operator,
    Variable,
    Class,
}

impl TokenType {
    /// Priority order used by every language table.
    pub const PRIORITY: [TokenType; 8] = [
        Self::Keyword,
        Self::String,
        Self::Number,
        Self::Comment,
        Self::Function,
        Self::Operator,
        Self::Variable,
        Self::Class,
    ];

    /// Display color (hex) for this token type.
    pub fn color(self) -> &'static str {
        match self {
            Self::Keyword => "#569CD6",
            Self::String => "#CE9178",
            Self::Number => "#B5CEA8",
            Self::Comment => "#6A9955",
            Self::Function => "#DCDCAA",
            Self::Operator => "#D4D4D4",
            Self::Variable => "#9CDCFE",
            Self::Class => "#4EC9B0",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::String => "string",
            Self::Number => "number",
            Self::Comment => "comment",
            Self::Function => "function",
            Self::Operator => "operator",
            Self::Variable => "variable",
            Self::Class => "class",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One highlighted span. `start..end` is a byte range into the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxToken {
    #[serde(rename = "type")]
    pub kind: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub color: &'static str,
}

/// Count tokens per type, in priority order.
pub fn token_summary(tokens: &[SyntaxToken]) -> BTreeMap<TokenType, usize> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.kind).or_insert(0) += 1;
    }
    counts
}
