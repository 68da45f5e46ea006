//! Regex-based syntax tokenizer.
//!
//! Each supported language is an ordered table of `(token type, pattern)`
//! pairs. A highlighting pass runs the patterns in table order and lets the
//! first pattern to claim a byte keep it, so the table order decides which
//! type wins an ambiguous span.

mod cache;
mod highlighter;
mod language;
mod token;

pub use highlighter::{DEFAULT_CACHE_CAPACITY, Highlighter};
pub use language::{Language, LanguageTable, Pattern};
pub use token::{SyntaxToken, TokenType, token_summary};
