//! Command history for devterm.
//!
//! [`HistoryStore`] keeps a bounded list of [`HistoryEntry`] values, oldest
//! first. It is backed by two [`Store`](devterm_types::store::Store)s, a
//! durable one and a session-scoped one, which are merged on open and both
//! rewritten after every mutation. Recall uses an explicit [`HistoryCursor`]
//! owned by the caller.

mod cursor;
mod entry;
mod stats;
mod store;
mod transfer;

pub use cursor::HistoryCursor;
pub use entry::{HistoryEntry, HistoryMeta};
pub use stats::{DayActivity, HistoryStatistics};
pub use store::{EntryStore, HistoryStore, SearchOptions};
