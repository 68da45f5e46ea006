//! Pre-dispatch screening of raw command lines.

use std::collections::HashSet;

use devterm_types::config::SecurityConfig;
use devterm_types::error::{DevtermError, Result};
use regex::Regex;

/// Blocks configured command names and dangerous line patterns.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    blocked_commands: HashSet<String>,
    blocked_patterns: Vec<Regex>,
}

impl SecurityPolicy {
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        Ok(Self {
            blocked_commands: config
                .blocked_commands
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
            blocked_patterns: config
                .blocked_patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<std::result::Result<_, _>>()?,
        })
    }

    /// A policy that lets everything through.
    pub fn permissive() -> Self {
        Self {
            blocked_commands: HashSet::new(),
            blocked_patterns: Vec::new(),
        }
    }

    /// Reject the line if any command word in it is blocked or any pattern
    /// matches. Command words are the first word of each `;`, `|` or `&`
    /// separated segment.
    pub fn check(&self, line: &str) -> Result<()> {
        for segment in line.split([';', '|', '&']) {
            if let Some(word) = segment.split_whitespace().next() {
                self.check_word(word)?;
            }
        }
        self.check_patterns(line)
    }

    /// Screen a command after alias and variable expansion. Only the first
    /// token names a command; the patterns run over the rejoined line.
    pub fn check_tokens(&self, tokens: &[String]) -> Result<()> {
        if let Some(word) = tokens.first() {
            self.check_word(word)?;
        }
        self.check_patterns(&tokens.join(" "))
    }

    fn check_word(&self, word: &str) -> Result<()> {
        let word = word.to_ascii_lowercase();
        if self.blocked_commands.contains(&word) {
            return Err(DevtermError::SecurityRejection(format!(
                "'{word}' is not available in this terminal"
            )));
        }
        Ok(())
    }

    fn check_patterns(&self, line: &str) -> Result<()> {
        if let Some(re) = self.blocked_patterns.iter().find(|re| re.is_match(line)) {
            return Err(DevtermError::SecurityRejection(format!(
                "line matches blocked pattern `{}`",
                re.as_str()
            )));
        }
        Ok(())
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        // The built-in patterns are known to compile.
        Self::from_config(&SecurityConfig::default()).unwrap_or_else(|_| Self::permissive())
    }
}
