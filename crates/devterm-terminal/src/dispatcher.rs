//! Async front door: one submitted line in, output entries out.
//!
//! Pipeline per line: security screening, variable expansion, tokenizing,
//! user alias expansion, a second screening of the expanded command,
//! optional simulated latency, handler run under a timeout, then history
//! recording and `$?` update.

use std::time::{Duration, Instant};

use devterm_complete::{AutoCompleteItem, CompletionContext, Ranker};
use devterm_history::HistoryMeta;
use devterm_types::config::EngineConfig;
use devterm_types::error::{DevtermError, Result};
use devterm_types::output::{OutputEntry, OutputLevel};
use log::{debug, warn};
use serde_json::json;

use crate::interpreter::{CommandOutput, CommandRegistry, expand_alias};
use crate::parser::{expand_variables, parse_line};
use crate::security::SecurityPolicy;
use crate::state::ShellState;

/// Routes command lines to registered handlers.
#[derive(Debug)]
pub struct Dispatcher {
    registry: CommandRegistry,
    policy: SecurityPolicy,
    ranker: Ranker,
    timeout: Duration,
    simulate_latency: bool,
}

impl Dispatcher {
    /// A dispatcher over every built-in command.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_registry(config, CommandRegistry::with_builtins())
    }

    pub fn with_registry(config: &EngineConfig, registry: CommandRegistry) -> Result<Self> {
        let mut config = config.clone();
        config.validate()?;
        let mut ranker = Ranker::new(&config.autocomplete);
        ranker.register_commands(registry.list_commands());
        Ok(Self {
            policy: SecurityPolicy::from_config(&config.security)?,
            ranker,
            registry,
            timeout: config.dispatcher.command_timeout(),
            simulate_latency: config.dispatcher.simulate_latency,
        })
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn ranker_mut(&mut self) -> &mut Ranker {
        &mut self.ranker
    }

    /// Run one line. Blank input yields no entries and no history record.
    pub async fn execute(&self, line: &str, state: &mut ShellState) -> Vec<OutputEntry> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();
        let result = self.dispatch(line, state).await;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(output) => {
                state.history.add(line, HistoryMeta::success(elapsed, output.render()));
                state.last_exit_code = 0;
                to_entries(output)
            },
            Err(err) => {
                let message = error_message(&err);
                state.history.add(line, HistoryMeta::failure(elapsed, message.clone()));
                state.last_exit_code = 1;
                vec![OutputEntry::error(message)]
            },
        }
    }

    async fn dispatch(&self, line: &str, state: &mut ShellState) -> Result<CommandOutput> {
        if let Err(err) = self.policy.check(line) {
            warn!("rejected `{line}`: {err}");
            return Err(err);
        }

        let expanded = expand_variables(line, &state.environment, state.last_exit_code);
        let parsed = parse_line(&expanded);
        if let Some(quote) = parsed.unterminated {
            debug!("unterminated {quote} quote in `{line}`, reading to end of line");
        }
        let tokens = expand_alias(parsed.tokens, state);
        if tokens.is_empty() {
            return Ok(CommandOutput::None);
        }
        if let Err(err) = self.policy.check_tokens(&tokens) {
            warn!("rejected `{line}` after expansion: {err}");
            return Err(err);
        }

        let latency = if self.simulate_latency {
            self.registry.latency(&tokens)
        } else {
            Duration::ZERO
        };
        debug!("dispatching {:?} (latency {}ms)", tokens, latency.as_millis());

        let run = async {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.registry.run(&tokens, state)
        };
        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("`{line}` timed out after {}ms", self.timeout.as_millis());
                Err(DevtermError::Timeout(self.timeout))
            },
        }
    }

    /// Completion suggestions for `input` with the cursor at byte offset
    /// `cursor`.
    pub fn suggest(&self, input: &str, cursor: usize, state: &ShellState) -> Vec<AutoCompleteItem> {
        let history: Vec<String> = state.history.entries().map(|e| e.command.clone()).collect();
        self.ranker.suggest(&CompletionContext {
            current_input: input,
            cursor_position: cursor,
            history: &history,
            environment: &state.environment,
        })
    }
}

fn error_message(err: &DevtermError) -> String {
    match err {
        DevtermError::CommandNotFound(name) => {
            format!("command not found: {name}. Type 'help' to list available commands.")
        },
        other => other.to_string(),
    }
}

fn to_entries(output: CommandOutput) -> Vec<OutputEntry> {
    match output {
        CommandOutput::None => Vec::new(),
        CommandOutput::Clear => {
            vec![OutputEntry::system("clear").with_metadata(json!({ "action": "clear" }))]
        },
        CommandOutput::Text(text) if text.is_empty() => Vec::new(),
        CommandOutput::Text(text) => vec![OutputEntry::new(OutputLevel::Success, text)],
        CommandOutput::Lines(lines) => lines
            .into_iter()
            .map(|(level, line)| OutputEntry::new(level, line))
            .collect(),
        table @ CommandOutput::Table { .. } => {
            vec![OutputEntry::info(table.render()).with_metadata(json!({ "format": "table" }))]
        },
    }
}
