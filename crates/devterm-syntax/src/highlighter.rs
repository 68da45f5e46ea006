use devterm_types::error::Result;

use crate::cache::TokenCache;
use crate::language::{Language, LanguageTable};
use crate::token::SyntaxToken;

/// First entry of the built-in table.
const DEFAULT_LANGUAGE: &str = "javascript";

/// Default number of cached highlight results.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Tokenizes source text with the built-in language tables.
#[derive(Debug)]
pub struct Highlighter {
    table: LanguageTable,
    cache: TokenCache,
}

impl Highlighter {
    pub fn new(cache_capacity: usize) -> Result<Self> {
        Ok(Self {
            table: LanguageTable::builtin()?,
            cache: TokenCache::new(cache_capacity),
        })
    }

    /// Tokenize `code` as `language` (name or alias). Tokens are sorted by
    /// start offset and never overlap. Unknown languages yield no tokens.
    pub fn highlight(&mut self, code: &str, language: &str) -> Vec<SyntaxToken> {
        let Some(lang) = self.table.find(language) else {
            log::debug!("no syntax table for {language:?}");
            return Vec::new();
        };
        if let Some(hit) = self.cache.get(lang.name, code) {
            log::debug!("highlight cache hit ({} bytes of {})", code.len(), lang.name);
            return hit.to_vec();
        }
        let tokens = tokenize(lang, code);
        self.cache.insert(lang.name, code, tokens.clone());
        tokens
    }

    /// Guess the language of `code`: the language with the most pattern
    /// matches wins, earlier table entries win ties (including the
    /// all-zero tie, which yields the first language).
    pub fn detect_language(&self, code: &str) -> &'static str {
        self.table
            .languages()
            .iter()
            .map(|lang| {
                let score: usize = lang.patterns.iter().map(|p| p.spans(code).count()).sum();
                (lang.name, score)
            })
            .fold(None, |best, (name, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((name, score)),
            })
            .map_or(DEFAULT_LANGUAGE, |(name, _)| name)
    }

    /// Language for a file name's extension, if supported.
    pub fn language_for_file(&self, file_name: &str) -> Option<&'static str> {
        self.table.for_file_name(file_name).map(|l| l.name)
    }

    pub fn languages(&self) -> Vec<&'static str> {
        self.table.names()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// One claiming pass over the pattern table.
fn tokenize(lang: &Language, code: &str) -> Vec<SyntaxToken> {
    let mut claimed = vec![false; code.len()];
    let mut tokens = Vec::new();
    for pattern in &lang.patterns {
        for (start, end) in pattern.spans(code) {
            if claimed[start..end].iter().any(|&c| c) {
                continue;
            }
            claimed[start..end].fill(true);
            tokens.push(SyntaxToken {
                kind: pattern.kind,
                value: code[start..end].to_string(),
                start,
                end,
                color: pattern.kind.color(),
            });
        }
    }
    tokens.sort_by_key(|t| t.start);
    tokens
}
