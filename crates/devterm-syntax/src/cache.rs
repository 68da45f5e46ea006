//! Bounded FIFO cache of highlight results.

use std::collections::{HashMap, VecDeque};

use crate::token::SyntaxToken;

type Key = (String, String);

/// Keyed by `(language, code)`. When full, the oldest insertion is evicted.
#[derive(Debug)]
pub(crate) struct TokenCache {
    capacity: usize,
    entries: HashMap<Key, Vec<SyntaxToken>>,
    order: VecDeque<Key>,
}

impl TokenCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, language: &str, code: &str) -> Option<&[SyntaxToken]> {
        // Tuple keys cannot be borrowed as (&str, &str); pay one allocation.
        self.entries
            .get(&(language.to_string(), code.to_string()))
            .map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, language: &str, code: &str, tokens: Vec<SyntaxToken>) {
        if self.capacity == 0 {
            return;
        }
        let key = (language.to_string(), code.to_string());
        if self.entries.contains_key(&key) {
            self.entries.insert(key, tokens);
            return;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                },
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, tokens);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
