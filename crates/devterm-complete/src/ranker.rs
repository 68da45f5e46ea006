use std::collections::{BTreeMap, HashSet};

use devterm_types::config::AutocompleteConfig;

use crate::catalog::{COMMANDS, COMMON, FUNCTIONS, KEYWORDS};
use crate::item::{AutoCompleteItem, ItemSource, ItemType};
use crate::score::score;

const HISTORY_BOOST: f64 = 10.0;
const CUSTOM_BOOST: f64 = 5.0;
const TOP_HISTORY: usize = 5;

/// Input to [`Ranker::suggest`].
#[derive(Debug, Clone, Copy)]
pub struct CompletionContext<'a> {
    pub current_input: &'a str,
    /// Byte offset of the cursor in `current_input`.
    pub cursor_position: usize,
    /// Submitted commands, oldest first.
    pub history: &'a [String],
    pub environment: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct Candidate {
    value: String,
    description: String,
}

/// Ranks completion candidates for the word under the cursor.
#[derive(Debug, Clone)]
pub struct Ranker {
    commands: Vec<Candidate>,
    custom: Vec<Candidate>,
    max_suggestions: usize,
    recent_history: usize,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(&AutocompleteConfig::default())
    }
}

impl Ranker {
    pub fn new(config: &AutocompleteConfig) -> Self {
        Self {
            commands: COMMANDS
                .iter()
                .map(|&(value, description)| Candidate {
                    value: value.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            custom: Vec::new(),
            max_suggestions: config.max_suggestions,
            recent_history: config.recent_history,
        }
    }

    /// Add commands to the command database. Names already known keep their
    /// existing description.
    pub fn register_commands<'a, I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut known: HashSet<String> = self.commands.iter().map(|c| c.value.clone()).collect();
        for (name, description) in commands {
            if known.insert(name.to_string()) {
                self.commands.push(Candidate {
                    value: name.to_string(),
                    description: description.to_string(),
                });
            }
        }
        log::debug!("autocomplete knows {} commands", self.commands.len());
    }

    /// Register a caller-defined completion. Values containing whitespace
    /// are offered as snippets.
    pub fn register_custom(&mut self, value: &str, description: &str) {
        self.custom.retain(|c| c.value != value);
        self.custom.push(Candidate {
            value: value.to_string(),
            description: description.to_string(),
        });
    }

    pub fn unregister_custom(&mut self, value: &str) -> bool {
        let before = self.custom.len();
        self.custom.retain(|c| c.value != value);
        self.custom.len() != before
    }

    /// Ranked suggestions for the word before the cursor, best first.
    pub fn suggest(&self, ctx: &CompletionContext<'_>) -> Vec<AutoCompleteItem> {
        let (_, word) = word_at(ctx.current_input, ctx.cursor_position);
        if word.is_empty() {
            return self.top_suggestions(ctx.history);
        }

        let mut items = Vec::new();

        for command in recent_unique(ctx.history, self.recent_history) {
            let s = score(word, &command);
            if s > 0.0 {
                items.push(AutoCompleteItem::new(
                    command,
                    ItemType::Command,
                    ItemSource::History,
                    s + HISTORY_BOOST,
                ));
            }
        }

        for c in &self.custom {
            let s = score(word, &c.value);
            if s > 0.0 {
                let kind = if c.value.contains(char::is_whitespace) {
                    ItemType::Snippet
                } else {
                    ItemType::Command
                };
                items.push(
                    AutoCompleteItem::new(&c.value, kind, ItemSource::Custom, s + CUSTOM_BOOST)
                        .described(&c.description),
                );
            }
        }

        for c in &self.commands {
            let s = score(word, &c.value);
            if s > 0.0 {
                items.push(
                    AutoCompleteItem::new(&c.value, ItemType::Command, ItemSource::Builtin, s)
                        .described(&c.description),
                );
            }
        }

        for (list, kind) in [(KEYWORDS, ItemType::Keyword), (FUNCTIONS, ItemType::Function)] {
            for &value in list {
                let s = score(word, value);
                if s > 0.0 {
                    items.push(AutoCompleteItem::new(value, kind, ItemSource::Builtin, s));
                }
            }
        }

        let var_word = word.strip_prefix('$').unwrap_or(word);
        for (name, value) in ctx.environment {
            let s = score(var_word, name);
            if s > 0.0 {
                items.push(
                    AutoCompleteItem::new(
                        format!("${name}"),
                        ItemType::Variable,
                        ItemSource::Environment,
                        s,
                    )
                    .with_metadata(serde_json::json!({ "value": value })),
                );
            }
        }

        self.finish(items)
    }

    /// Suggestions for an empty word: recent history, then common commands.
    fn top_suggestions(&self, history: &[String]) -> Vec<AutoCompleteItem> {
        let mut items: Vec<AutoCompleteItem> = recent_unique(history, TOP_HISTORY)
            .into_iter()
            .enumerate()
            .map(|(i, cmd)| {
                AutoCompleteItem::new(cmd, ItemType::Command, ItemSource::History, 90.0 - i as f64)
            })
            .collect();
        items.extend(COMMON.iter().enumerate().map(|(i, &cmd)| {
            AutoCompleteItem::new(cmd, ItemType::Command, ItemSource::Builtin, 50.0 - i as f64)
        }));
        self.finish(items)
    }

    /// De-duplicate by value (first wins), sort by score and cap.
    fn finish(&self, items: Vec<AutoCompleteItem>) -> Vec<AutoCompleteItem> {
        let mut seen = HashSet::new();
        let mut items: Vec<_> = items
            .into_iter()
            .filter(|i| seen.insert(i.value.clone()))
            .collect();
        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items.truncate(self.max_suggestions);
        items
    }
}

/// Most recent first, without repeats.
fn recent_unique(history: &[String], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    history
        .iter()
        .rev()
        .filter(|c| seen.insert(c.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

/// Start offset and text of the word ending at `cursor`. The cursor is
/// clamped to the input and moved back to a char boundary. Input ending in
/// whitespace has an empty word.
pub fn word_at(input: &str, cursor: usize) -> (usize, &str) {
    let mut cursor = cursor.min(input.len());
    while !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let before = &input[..cursor];
    let start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    (start, &before[start..])
}

/// Insert `item` at the cursor. History items replace everything before the
/// cursor; other items replace the current word. Returns the new input and
/// cursor.
pub fn apply(input: &str, cursor: usize, item: &AutoCompleteItem) -> (String, usize) {
    let (word_start, word) = word_at(input, cursor);
    let end = word_start + word.len();
    let start = if item.source == ItemSource::History {
        0
    } else {
        word_start
    };
    let mut out = String::with_capacity(input.len() + item.value.len());
    out.push_str(&input[..start]);
    out.push_str(&item.value);
    out.push_str(&input[end..]);
    (out, start + item.value.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        input: &'a str,
        history: &'a [String],
        env: &'a BTreeMap<String, String>,
    ) -> CompletionContext<'a> {
        CompletionContext {
            current_input: input,
            cursor_position: input.len(),
            history,
            environment: env,
        }
    }

    fn values(items: &[AutoCompleteItem]) -> Vec<&str> {
        items.iter().map(|i| i.value.as_str()).collect()
    }

    #[test]
    fn he_ranks_prefixes_above_substrings() {
        let mut ranker = Ranker::default();
        ranker.register_custom("he", "");
        ranker.register_custom("theme", "");
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("he", &[], &env));

        assert_eq!(items[0].value, "he");
        let pos = |v: &str| items.iter().position(|i| i.value == v);
        let help = pos("help").unwrap();
        let head = pos("head").unwrap();
        let theme = pos("theme").unwrap();
        assert!(help < theme && head < theme);
        for item in &items[1..] {
            assert!(item.score < items[0].score);
        }
        if let Some(echo) = pos("echo") {
            assert!(help < echo && head < echo);
        }
    }

    #[test]
    fn empty_word_gives_history_then_common() {
        let ranker = Ranker::default();
        let history: Vec<String> = ["ls", "npm test", "ls", "git log"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("", &history, &env));
        assert_eq!(&values(&items)[..3], ["git log", "ls", "npm test"]);
        assert_eq!(items[0].score, 90.0);
        assert_eq!(items.len(), 10);
        // "ls" from history wins over the common entry.
        assert_eq!(values(&items).iter().filter(|v| **v == "ls").count(), 1);
    }

    #[test]
    fn trailing_space_means_empty_word() {
        let ranker = Ranker::default();
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("git ", &[], &env));
        assert_eq!(items[0].value, "ls");
    }

    #[test]
    fn environment_variables_match_without_dollar() {
        let ranker = Ranker::default();
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), "/home/dev".to_string());
        let items = ranker.suggest(&ctx("echo $HO", &[], &env));
        assert_eq!(items[0].value, "$HOME");
        assert_eq!(items[0].kind, ItemType::Variable);
        assert_eq!(items[0].metadata.as_ref().unwrap()["value"], "/home/dev");
    }

    #[test]
    fn history_boost_and_dedupe() {
        let ranker = Ranker::default();
        let history = vec!["git".to_string()];
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("git", &history, &env));
        assert_eq!(items[0].value, "git");
        assert_eq!(items[0].source, ItemSource::History);
        assert_eq!(items[0].score, 110.0);
        assert_eq!(values(&items).iter().filter(|v| **v == "git").count(), 1);
    }

    #[test]
    fn registered_commands_are_suggested() {
        let mut ranker = Ranker::default();
        ranker.register_commands([("vitest", "Run vitest"), ("ls", "ignored")]);
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("vit", &[], &env));
        assert_eq!(items[0].value, "vitest");
        assert_eq!(items[0].description.as_deref(), Some("Run vitest"));

        let items = ranker.suggest(&ctx("ls", &[], &env));
        assert_eq!(items[0].description.as_deref(), Some("List directory contents"));
    }

    #[test]
    fn custom_snippets_and_unregister() {
        let mut ranker = Ranker::default();
        ranker.register_custom("deploy --prod", "Ship it");
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("depl", &[], &env));
        assert_eq!(items[0].kind, ItemType::Snippet);
        assert!(ranker.unregister_custom("deploy --prod"));
        assert!(ranker.suggest(&ctx("depl", &[], &env)).is_empty());
    }

    #[test]
    fn suggestions_are_capped_and_sorted() {
        let ranker = Ranker::default();
        let env = BTreeMap::new();
        let items = ranker.suggest(&ctx("e", &[], &env));
        assert!(items.len() <= 10);
        for pair in items.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn word_at_clamps_and_splits() {
        assert_eq!(word_at("git sta", 7), (4, "sta"));
        assert_eq!(word_at("git sta", 99), (4, "sta"));
        assert_eq!(word_at("git ", 4), (4, ""));
        assert_eq!(word_at("caf\u{e9}", 4), (0, "caf"));
    }

    #[test]
    fn apply_replaces_word() {
        let item = AutoCompleteItem::new("status", ItemType::Command, ItemSource::Builtin, 90.0);
        assert_eq!(apply("git sta", 7, &item), ("git status".to_string(), 10));
        assert_eq!(apply("git sta -v", 7, &item), ("git status -v".to_string(), 10));
    }

    #[test]
    fn apply_history_replaces_line() {
        let item = AutoCompleteItem::new("git status", ItemType::Command, ItemSource::History, 90.0);
        assert_eq!(apply("git st", 6, &item), ("git status".to_string(), 10));
    }
}
