use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use devterm_types::config::{HistoryConfig, MAX_HISTORY, MIN_HISTORY};
use devterm_types::error::Result;
use devterm_types::store::{MemoryStore, Store};
use devterm_types::time::{new_id, now_ms};
use regex::RegexBuilder;

use crate::cursor::HistoryCursor;
use crate::entry::{HistoryEntry, HistoryMeta};

/// Persistence handle for the entry list.
pub type EntryStore = Box<dyn Store<Vec<HistoryEntry>>>;

/// Options for [`HistoryStore::search`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Treat the query as a regular expression.
    pub regex: bool,
    pub limit: Option<usize>,
}

/// Bounded command history, oldest entry first.
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    durable: EntryStore,
    session: EntryStore,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Open a history backed by `durable` and `session`.
    ///
    /// Entries from both stores are merged, de-duplicated by id, sorted by
    /// timestamp and trimmed to the bound. A store that fails to load is
    /// logged and treated as empty.
    pub fn open(config: &HistoryConfig, durable: EntryStore, session: EntryStore) -> Self {
        let mut merged = Vec::new();
        for (label, store) in [("durable", &durable), ("session", &session)] {
            match store.load() {
                Ok(Some(list)) => merged.extend(list),
                Ok(None) => {},
                Err(e) => log::warn!("failed to load {label} history: {e}"),
            }
        }

        let mut seen = HashSet::new();
        merged.retain(|e: &HistoryEntry| seen.insert(e.id.clone()));
        merged.sort_by_key(|e| e.timestamp);

        let mut store = Self {
            entries: merged.into(),
            max_entries: config.max_entries.clamp(MIN_HISTORY, MAX_HISTORY),
            durable,
            session,
        };
        store.trim();
        log::info!(
            "history loaded: {} entries (bound {})",
            store.entries.len(),
            store.max_entries
        );
        store
    }

    /// History with in-memory stores and the default bound.
    pub fn in_memory() -> Self {
        Self::open(
            &HistoryConfig::default(),
            Box::new(MemoryStore::<Vec<HistoryEntry>>::new()),
            Box::new(MemoryStore::<Vec<HistoryEntry>>::new()),
        )
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Record a command. Blank commands are ignored.
    pub fn add(&mut self, command: &str, meta: HistoryMeta) -> Option<HistoryEntry> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }
        let entry = HistoryEntry {
            id: new_id(),
            command: command.to_string(),
            timestamp: now_ms(),
            execution_time: meta.execution_time,
            exit_code: meta.exit_code,
            output: meta.output,
            error: meta.error,
        };
        self.entries.push_back(entry.clone());
        self.trim();
        self.persist();
        Some(entry)
    }

    /// Step back through history. A reset cursor starts at the newest entry;
    /// the oldest entry is sticky.
    pub fn previous(&self, cursor: HistoryCursor) -> (HistoryCursor, Option<String>) {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return (HistoryCursor::reset(), None);
        };
        let pos = match cursor.position() {
            None => last,
            Some(i) => i.saturating_sub(1).min(last),
        };
        (HistoryCursor::at(pos), Some(self.entries[pos].command.clone()))
    }

    /// Step forward. Walking past the newest entry resets the cursor and
    /// yields an empty line; a reset cursor yields nothing.
    pub fn next(&self, cursor: HistoryCursor) -> (HistoryCursor, Option<String>) {
        match cursor.position() {
            None => (cursor, None),
            Some(i) if i + 1 < self.entries.len() => (
                HistoryCursor::at(i + 1),
                Some(self.entries[i + 1].command.clone()),
            ),
            Some(_) => (HistoryCursor::reset(), Some(String::new())),
        }
    }

    /// Entries whose command matches `query`, most recent first.
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<HistoryEntry>> {
        let limit = options.limit.unwrap_or(usize::MAX);
        let found = if options.regex {
            let re = RegexBuilder::new(query)
                .case_insensitive(!options.case_sensitive)
                .build()?;
            self.entries
                .iter()
                .rev()
                .filter(|e| re.is_match(&e.command))
                .take(limit)
                .cloned()
                .collect()
        } else if options.case_sensitive {
            self.entries
                .iter()
                .rev()
                .filter(|e| e.command.contains(query))
                .take(limit)
                .cloned()
                .collect()
        } else {
            let needle = query.to_lowercase();
            self.entries
                .iter()
                .rev()
                .filter(|e| e.command.to_lowercase().contains(&needle))
                .take(limit)
                .cloned()
                .collect()
        };
        Ok(found)
    }

    /// Most frequent commands with their counts. Ties go to the command used
    /// most recently.
    pub fn most_used(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let slot = counts.entry(entry.command.as_str()).or_insert((0, i));
            slot.0 += 1;
            slot.1 = i;
        }
        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(b.1.1.cmp(&a.1.1)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(cmd, (count, _))| (cmd.to_string(), count))
            .collect()
    }

    /// Commands in most-recent-first order without repeats.
    pub fn recent_unique(&self, limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .rev()
            .filter(|e| seen.insert(e.command.as_str()))
            .take(limit)
            .map(|e| e.command.clone())
            .collect()
    }

    /// Keep only the most recent entry per command text. Returns how many
    /// entries were dropped.
    pub fn remove_duplicates(&mut self) -> usize {
        let before = self.entries.len();
        let mut seen = HashSet::new();
        let mut kept: Vec<HistoryEntry> = self
            .entries
            .drain(..)
            .rev()
            .filter(|e| seen.insert(e.command.clone()))
            .collect();
        kept.reverse();
        self.entries = kept.into();
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Append entries whose ids are not present yet, keeping timestamp
    /// order. Returns how many were added.
    pub(crate) fn merge(&mut self, incoming: Vec<HistoryEntry>) -> usize {
        let mut ids: HashSet<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        let mut added = 0;
        for entry in incoming {
            if ids.insert(entry.id.clone()) {
                self.entries.push_back(entry);
                added += 1;
            }
        }
        if added > 0 {
            self.entries.make_contiguous().sort_by_key(|e| e.timestamp);
            self.trim();
            self.persist();
        }
        added
    }

    fn trim(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            self.entries.drain(..excess);
            log::debug!("history trimmed {excess} oldest entries");
        }
    }

    fn persist(&mut self) {
        let list: Vec<HistoryEntry> = self.entries.iter().cloned().collect();
        if let Err(e) = self.durable.save(&list) {
            log::warn!("failed to save durable history: {e}");
        }
        if let Err(e) = self.session.save(&list) {
            log::warn!("failed to save session history: {e}");
        }
    }
}
