//! Command trait, output type and the name-to-handler registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;

use crate::state::ShellState;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Plain text, possibly multi-line.
    Text(String),
    /// Lines with their own levels (progress, warnings, summaries).
    Lines(Vec<(OutputLevel, String)>),
    /// Tabular data (header row + data rows).
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Command produced no visible output.
    None,
    /// Signal to clear the terminal output buffer.
    Clear,
}

impl CommandOutput {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Builder for [`CommandOutput::Lines`].
    pub fn lines() -> LinesBuilder {
        LinesBuilder(Vec::new())
    }

    /// Flatten to plain text (tables are padded into columns).
    pub fn render(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Lines(lines) => lines
                .iter()
                .map(|(_, l)| l.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Table { headers, rows } => render_table(headers, rows),
            Self::None | Self::Clear => String::new(),
        }
    }
}

/// Accumulates leveled lines.
#[derive(Debug, Default)]
pub struct LinesBuilder(Vec<(OutputLevel, String)>);

impl LinesBuilder {
    pub fn info(mut self, line: impl Into<String>) -> Self {
        self.0.push((OutputLevel::Info, line.into()));
        self
    }

    pub fn success(mut self, line: impl Into<String>) -> Self {
        self.0.push((OutputLevel::Success, line.into()));
        self
    }

    pub fn warning(mut self, line: impl Into<String>) -> Self {
        self.0.push((OutputLevel::Warning, line.into()));
        self
    }

    pub fn push(&mut self, level: OutputLevel, line: impl Into<String>) {
        self.0.push((level, line.into()));
    }

    pub fn build(self) -> CommandOutput {
        CommandOutput::Lines(self.0)
    }
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let w = cell.chars().count();
            match widths.get_mut(i) {
                Some(slot) => *slot = (*slot).max(w),
                None => widths.push(w),
            }
        }
    }
    let fmt_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let mut out = vec![fmt_row(headers)];
    out.extend(rows.iter().map(|r| fmt_row(r)));
    out.join("\n")
}

/// Command grouping used by `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    File,
    Vcs,
    Package,
    Build,
    Server,
    Test,
    Lint,
    Process,
    Network,
    Utility,
    Ai,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Self::File,
        Self::Vcs,
        Self::Package,
        Self::Build,
        Self::Server,
        Self::Test,
        Self::Lint,
        Self::Process,
        Self::Network,
        Self::Utility,
        Self::Ai,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Vcs => "vcs",
            Self::Package => "package",
            Self::Build => "build",
            Self::Server => "server",
            Self::Test => "test",
            Self::Lint => "lint",
            Self::Process => "process",
            Self::Network => "network",
            Self::Utility => "utility",
            Self::Ai => "ai",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::File => "File system",
            Self::Vcs => "Version control",
            Self::Package => "Package managers",
            Self::Build => "Build tools",
            Self::Server => "Dev servers",
            Self::Test => "Testing",
            Self::Lint => "Linting and formatting",
            Self::Process => "Processes",
            Self::Network => "Network",
            Self::Utility => "Shell utilities",
            Self::Ai => "AI assistance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DevtermError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| DevtermError::Command(format!("unknown category: {s}")))
    }
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[path\]").
    fn usage(&self) -> &str;

    /// Command category for grouping in `help` output.
    fn category(&self) -> Category {
        Category::Utility
    }

    /// Alternate names resolving to this command.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Simulated run time for these arguments. Only awaited when latency
    /// simulation is on.
    fn latency(&self, _args: &[&str]) -> Duration {
        Duration::ZERO
    }

    /// Execute the command with the given arguments and shell state.
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput>;
}

/// Registry of available commands.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
    aliases: HashMap<String, String>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// A registry holding every built-in command.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::commands::register_utility_commands(&mut reg);
        crate::file_commands::register_file_commands(&mut reg);
        crate::vcs_commands::register_vcs_commands(&mut reg);
        crate::package_commands::register_package_commands(&mut reg);
        crate::dev_commands::register_dev_commands(&mut reg);
        crate::system_commands::register_system_commands(&mut reg);
        crate::ai_commands::register_ai_commands(&mut reg);
        reg
    }

    /// Register a command and its aliases. Replaces any existing command with
    /// the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let name = cmd.name().to_ascii_lowercase();
        for alias in cmd.aliases() {
            self.aliases.insert(alias.to_ascii_lowercase(), name.clone());
        }
        self.commands.insert(name, cmd);
    }

    /// Look a command up by name or alias (case-insensitive).
    pub fn resolve(&self, name: &str) -> Option<&dyn Command> {
        let lower = name.to_ascii_lowercase();
        let key = self.aliases.get(&lower).unwrap_or(&lower);
        self.commands.get(key).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Return a sorted list of (name, description) pairs.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }

    /// Commands in one category, sorted by name.
    pub fn in_category(&self, category: Category) -> Vec<&dyn Command> {
        let mut cmds: Vec<&dyn Command> = self
            .commands
            .values()
            .filter(|c| c.category() == category)
            .map(|c| c.as_ref())
            .collect();
        cmds.sort_by(|a, b| a.name().cmp(b.name()));
        cmds
    }

    /// Categories with at least one command.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.commands.values().any(|cmd| cmd.category() == *c))
            .collect()
    }

    /// Aliases registered for `name`, sorted.
    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// Parse and run one line: user alias expansion, `help`/`which`
    /// interception, lookup, execute. No variable expansion.
    pub fn execute(&self, line: &str, state: &mut ShellState) -> Result<CommandOutput> {
        let tokens = expand_alias(crate::parser::parse(line), state);
        self.run(&tokens, state)
    }

    /// Run an already tokenized command.
    pub fn run(&self, tokens: &[String], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(CommandOutput::None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        match name.to_ascii_lowercase().as_str() {
            "help" => self.help(&args),
            "which" => self.which(&args, state),
            lower => match self.resolve(lower) {
                Some(cmd) => cmd.execute(&args, state),
                None => Err(DevtermError::CommandNotFound(name.clone())),
            },
        }
    }

    /// Declared latency of a tokenized command (zero when unknown).
    pub fn latency(&self, tokens: &[String]) -> Duration {
        let Some((name, rest)) = tokens.split_first() else {
            return Duration::ZERO;
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.resolve(name)
            .map_or(Duration::ZERO, |cmd| cmd.latency(&args))
    }

    /// `help`, `help <category>` and `help <command>`.
    pub fn help(&self, args: &[&str]) -> Result<CommandOutput> {
        let Some(&topic) = args.first() else {
            let mut out = format!("Available commands ({}):\n", self.len());
            for cat in Category::ALL {
                let n = self.in_category(cat).len();
                if n > 0 {
                    out.push_str(&format!("  {:<10} {:<24} ({n})\n", cat.as_str(), cat.title()));
                }
            }
            out.push_str("\nType 'help <category>' or 'help <command>' for details.");
            return Ok(CommandOutput::Text(out));
        };

        if let Ok(cat) = topic.parse::<Category>() {
            let mut out = format!("{} commands:\n", cat.title());
            for cmd in self.in_category(cat) {
                out.push_str(&format!("  {:12} {}\n", cmd.name(), cmd.description()));
            }
            return Ok(CommandOutput::Text(out.trim_end().to_string()));
        }

        match self.resolve(topic) {
            Some(cmd) => {
                let mut out = format!("{} ({})\n", cmd.name(), cmd.category());
                out.push_str(&format!("  {}\n", cmd.description()));
                out.push_str(&format!("  Usage: {}", cmd.usage()));
                let aliases = self.aliases_of(cmd.name());
                if !aliases.is_empty() {
                    out.push_str(&format!("\n  Aliases: {}", aliases.join(", ")));
                }
                Ok(CommandOutput::Text(out))
            },
            None => Err(DevtermError::Command(format!(
                "no help for '{topic}': not a command or category"
            ))),
        }
    }

    /// `which <command>`: how a name resolves.
    pub fn which(&self, args: &[&str], state: &ShellState) -> Result<CommandOutput> {
        let Some(&name) = args.first() else {
            return Err(DevtermError::usage("which <command>"));
        };
        if let Some(expansion) = state.aliases.get(name) {
            return Ok(CommandOutput::Text(format!("{name}: aliased to '{expansion}'")));
        }
        let lower = name.to_ascii_lowercase();
        match self.resolve(&lower) {
            Some(cmd) if cmd.name() != lower => Ok(CommandOutput::Text(format!(
                "{lower}: alias for {} ({})",
                cmd.name(),
                cmd.category()
            ))),
            Some(cmd) => Ok(CommandOutput::Text(format!(
                "/usr/bin/{}: {} ({})",
                cmd.name(),
                cmd.description(),
                cmd.category()
            ))),
            None => Err(DevtermError::Command(format!("{name}: not found"))),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace a leading user alias with its parsed expansion. One level only,
/// so self-referencing aliases (`alias ls='ls -l'`) terminate.
pub fn expand_alias(tokens: Vec<String>, state: &ShellState) -> Vec<String> {
    let Some(expansion) = tokens.first().and_then(|t| state.aliases.get(t)) else {
        return tokens;
    };
    let mut out = crate::parser::parse(expansion);
    out.extend(tokens.into_iter().skip(1));
    out
}

/// First positional argument or a usage error.
pub(crate) fn require<'a>(args: &[&'a str], usage: &str) -> Result<&'a str> {
    args.iter()
        .find(|a| !a.starts_with('-'))
        .copied()
        .ok_or_else(|| DevtermError::usage(usage))
}

/// Non-flag arguments.
pub(crate) fn positional<'a>(args: &[&'a str]) -> Vec<&'a str> {
    args.iter().copied().filter(|a| !a.starts_with('-') || *a == "-").collect()
}

/// True when any short flag cluster contains `flag` or a long flag equals it.
pub(crate) fn has_flag(args: &[&str], short: char, long: &str) -> bool {
    args.iter().any(|a| {
        if let Some(l) = a.strip_prefix("--") {
            l == long
        } else if let Some(s) = a.strip_prefix('-') {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) && s.contains(short)
        } else {
            false
        }
    })
}

/// Value following `flag` (e.g. `-n 5`) or attached to it (`-n5`).
pub(crate) fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    let mut iter = args.iter();
    while let Some(&a) = iter.next() {
        if a == flag {
            return iter.next().copied();
        }
        if let Some(rest) = a.strip_prefix(flag)
            && !rest.is_empty()
            && !flag.starts_with("--")
        {
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoCmd;
    impl Command for EchoCmd {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Print arguments"
        }
        fn usage(&self) -> &str {
            "echo [text...]"
        }
        fn aliases(&self) -> &[&str] {
            &["say"]
        }
        fn execute(&self, args: &[&str], _: &mut ShellState) -> Result<CommandOutput> {
            Ok(CommandOutput::Text(args.join(" ")))
        }
    }

    #[test]
    fn register_and_resolve_alias() {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(EchoCmd));
        assert_eq!(reg.resolve("ECHO").unwrap().name(), "echo");
        assert_eq!(reg.resolve("say").unwrap().name(), "echo");
        assert!(reg.resolve("nope").is_none());
        assert_eq!(reg.aliases_of("echo"), ["say"]);
    }

    #[test]
    fn help_for_unknown_topic_errors() {
        let reg = CommandRegistry::new();
        assert!(reg.help(&["zzz"]).is_err());
    }

    #[test]
    fn category_parse() {
        assert_eq!("VCS".parse::<Category>().unwrap(), Category::Vcs);
        assert!("nope".parse::<Category>().is_err());
    }

    #[test]
    fn table_render_pads_columns() {
        let out = CommandOutput::Table {
            headers: vec!["PID".into(), "NAME".into()],
            rows: vec![vec!["1".into(), "devsh".into()], vec!["1024".into(), "vite".into()]],
        };
        assert_eq!(out.render(), "PID   NAME\n1     devsh\n1024  vite");
    }

    #[test]
    fn lines_render_joined() {
        let out = CommandOutput::lines().info("a").warning("b").build();
        assert_eq!(out.render(), "a\nb");
    }

    #[test]
    fn flag_helpers() {
        assert!(has_flag(&["-la"], 'a', "all"));
        assert!(has_flag(&["--all"], 'a', "all"));
        assert!(!has_flag(&["-5"], '5', "x"));
        assert_eq!(flag_value(&["-n", "5", "f"], "-n"), Some("5"));
        assert_eq!(flag_value(&["-n5"], "-n"), Some("5"));
        assert_eq!(flag_value(&["--port", "80"], "--port"), Some("80"));
        assert_eq!(require(&["-v", "x"], "u").unwrap(), "x");
        assert!(require(&["-v"], "u").is_err());
        assert_eq!(positional(&["-a", "b", "-", "c"]), ["b", "-", "c"]);
    }
}
