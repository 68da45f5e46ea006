//! Autocomplete for the devterm shell.
//!
//! [`Ranker`] scores candidates from several sources (known commands,
//! keywords, built-in functions, environment variables, recent history and
//! caller-registered entries) against the word under the cursor.

mod catalog;
mod item;
mod ranker;
mod score;

pub use item::{AutoCompleteItem, ItemSource, ItemType};
pub use ranker::{CompletionContext, Ranker, apply, word_at};
pub use score::score;
