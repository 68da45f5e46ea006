//! Shell utility commands: help, which, clear, echo, env, export, unset,
//! alias, unalias, history, date, whoami, hostname, uname, sleep.

use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use devterm_history::SearchOptions;
use devterm_types::error::{DevtermError, Result};
use devterm_types::format::ExportFormat;
use devterm_types::output::OutputLevel;
use devterm_types::time::{format_ms, now_ms, to_datetime};

use crate::interpreter::{Command, CommandOutput, CommandRegistry, flag_value, has_flag};
use crate::parser::quote;
use crate::state::ShellState;

/// Longest `sleep` accepted, in seconds.
const MAX_SLEEP_SECS: f64 = 3600.0;
const KERNEL: &str = "6.1.0-devterm";

/// Register the utility commands.
pub fn register_utility_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(HelpCmd));
    reg.register(Box::new(WhichCmd));
    reg.register(Box::new(ClearCmd));
    reg.register(Box::new(EchoCmd));
    reg.register(Box::new(EnvCmd));
    reg.register(Box::new(ExportCmd));
    reg.register(Box::new(UnsetCmd));
    reg.register(Box::new(AliasCmd));
    reg.register(Box::new(UnaliasCmd));
    reg.register(Box::new(HistoryCmd));
    reg.register(Box::new(DateCmd));
    reg.register(Box::new(WhoamiCmd));
    reg.register(Box::new(HostnameCmd));
    reg.register(Box::new(UnameCmd));
    reg.register(Box::new(SleepCmd));
}

/// Shell variable names: a letter or underscore, then word characters.
fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// help / which
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "List command categories, a category, or one command"
    }
    fn usage(&self) -> &str {
        "help [category|command]"
    }
    fn execute(&self, _args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        // The registry intercepts `help` since it needs the command table.
        Ok(CommandOutput::Text(
            "Use 'help' at the prompt for a list of commands.".to_string(),
        ))
    }
}

struct WhichCmd;
impl Command for WhichCmd {
    fn name(&self) -> &str {
        "which"
    }
    fn description(&self) -> &str {
        "Show how a command name resolves"
    }
    fn usage(&self) -> &str {
        "which <command>"
    }
    fn execute(&self, _args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        // Intercepted by the registry like `help`.
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the terminal output"
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn aliases(&self) -> &[&str] {
        &["cls"]
    }
    fn execute(&self, _args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print arguments"
    }
    fn usage(&self) -> &str {
        "echo [-n] [text...]"
    }
    fn execute(&self, args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        let args = match args.first() {
            Some(&"-n") => &args[1..],
            _ => args,
        };
        Ok(CommandOutput::Text(args.join(" ")))
    }
}

// ---------------------------------------------------------------------------
// env / export / unset
// ---------------------------------------------------------------------------

struct EnvCmd;
impl Command for EnvCmd {
    fn name(&self) -> &str {
        "env"
    }
    fn description(&self) -> &str {
        "Print environment variables"
    }
    fn usage(&self) -> &str {
        "env"
    }
    fn aliases(&self) -> &[&str] {
        &["printenv"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if let Some(&name) = args.first() {
            return state
                .environment
                .get(name)
                .map(|v| CommandOutput::Text(v.clone()))
                .ok_or_else(|| DevtermError::Command(format!("env: {name} is not set")));
        }
        let lines: Vec<String> = state
            .environment
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

struct ExportCmd;
impl Command for ExportCmd {
    fn name(&self) -> &str {
        "export"
    }
    fn description(&self) -> &str {
        "Set environment variables"
    }
    fn usage(&self) -> &str {
        "export KEY=value..."
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if args.is_empty() {
            let lines: Vec<String> = state
                .environment
                .iter()
                .map(|(k, v)| format!("declare -x {k}=\"{v}\""))
                .collect();
            return Ok(CommandOutput::Text(lines.join("\n")));
        }
        // Validate everything before touching the environment.
        let mut pairs = Vec::with_capacity(args.len());
        for arg in args {
            let (key, value) = arg.split_once('=').unwrap_or((*arg, ""));
            if !valid_name(key) {
                return Err(DevtermError::Command(format!(
                    "export: '{arg}': not a valid identifier"
                )));
            }
            pairs.push((key, value));
        }
        for (key, value) in pairs {
            if key == "PWD" {
                log::debug!("export PWD ignored; use cd");
                continue;
            }
            state.environment.insert(key.to_string(), value.to_string());
        }
        Ok(CommandOutput::None)
    }
}

struct UnsetCmd;
impl Command for UnsetCmd {
    fn name(&self) -> &str {
        "unset"
    }
    fn description(&self) -> &str {
        "Remove environment variables"
    }
    fn usage(&self) -> &str {
        "unset KEY..."
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for key in args {
            state.environment.remove(*key);
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// alias / unalias
// ---------------------------------------------------------------------------

struct AliasCmd;
impl Command for AliasCmd {
    fn name(&self) -> &str {
        "alias"
    }
    fn description(&self) -> &str {
        "Define or list command aliases"
    }
    fn usage(&self) -> &str {
        "alias [name[=value]...]"
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let show = |name: &str, value: &str| format!("alias {name}={}", quote_always(value));
        if args.is_empty() {
            let lines: Vec<String> = state.aliases.iter().map(|(k, v)| show(k, v)).collect();
            return Ok(CommandOutput::Text(lines.join("\n")));
        }
        let mut out = Vec::new();
        for arg in args {
            match arg.split_once('=') {
                Some((name, value)) => {
                    if !valid_alias_name(name) {
                        return Err(DevtermError::Command(format!(
                            "alias: '{name}': invalid alias name"
                        )));
                    }
                    state.aliases.insert(name.to_string(), value.to_string());
                },
                None => match state.aliases.get(*arg) {
                    Some(value) => out.push(show(arg, value)),
                    None => {
                        return Err(DevtermError::Command(format!("alias: {arg}: not found")));
                    },
                },
            }
        }
        if out.is_empty() {
            Ok(CommandOutput::None)
        } else {
            Ok(CommandOutput::Text(out.join("\n")))
        }
    }
}

fn valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn quote_always(value: &str) -> String {
    let q = quote(value);
    if q.starts_with('\'') { q } else { format!("'{q}'") }
}

struct UnaliasCmd;
impl Command for UnaliasCmd {
    fn name(&self) -> &str {
        "unalias"
    }
    fn description(&self) -> &str {
        "Remove command aliases"
    }
    fn usage(&self) -> &str {
        "unalias [-a] name..."
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if args.first() == Some(&"-a") {
            state.aliases.clear();
            return Ok(CommandOutput::None);
        }
        if args.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for name in args {
            if state.aliases.remove(*name).is_none() {
                return Err(DevtermError::Command(format!("unalias: {name}: not found")));
            }
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

struct HistoryCmd;
impl Command for HistoryCmd {
    fn name(&self) -> &str {
        "history"
    }
    fn description(&self) -> &str {
        "Show, search, summarize or export command history"
    }
    fn usage(&self) -> &str {
        "history [N | -c | search <query> [-r] [-c] | stats | top [N] | dedupe | export [json|csv|txt]]"
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        match args.first().copied() {
            None => Ok(list_history(state, None)),
            Some("-c") | Some("clear") => {
                state.history.clear();
                Ok(CommandOutput::text("history cleared"))
            },
            Some("search") => {
                let query = args
                    .get(1)
                    .ok_or_else(|| DevtermError::usage("history search <query> [-r] [-c] [-n N]"))?;
                let options = SearchOptions {
                    regex: has_flag(&args[2..], 'r', "regex"),
                    case_sensitive: has_flag(&args[2..], 'c', "case-sensitive"),
                    limit: flag_value(&args[2..], "-n").and_then(|n| n.parse().ok()),
                };
                let hits = state.history.search(query, options)?;
                if hits.is_empty() {
                    return Ok(CommandOutput::text(format!("no history matches '{query}'")));
                }
                let lines: Vec<String> = hits
                    .iter()
                    .map(|e| format!("[{}] {}", format_ms(e.timestamp), e.command))
                    .collect();
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            Some("stats") => {
                let stats = state.history.statistics();
                let mut out = CommandOutput::lines()
                    .info(format!("Total commands:   {}", stats.total_commands))
                    .info(format!("Unique commands:  {}", stats.unique_commands))
                    .info(format!(
                        "Average time:     {:.1}ms",
                        stats.average_execution_time
                    ))
                    .info(format!("Success rate:     {:.1}%", stats.success_rate))
                    .info("Last 7 days:");
                for day in &stats.recent_activity {
                    out.push(OutputLevel::Info, format!("  {}  {}", day.date, day.count));
                }
                Ok(out.build())
            },
            Some("top") => {
                let limit = args.get(1).and_then(|n| n.parse().ok()).unwrap_or(10);
                Ok(CommandOutput::Table {
                    headers: vec!["COUNT".to_string(), "COMMAND".to_string()],
                    rows: state
                        .history
                        .most_used(limit)
                        .into_iter()
                        .map(|(cmd, n)| vec![n.to_string(), cmd])
                        .collect(),
                })
            },
            Some("dedupe") => {
                let removed = state.history.remove_duplicates();
                Ok(CommandOutput::text(format!(
                    "removed {removed} duplicate entr{}",
                    if removed == 1 { "y" } else { "ies" }
                )))
            },
            Some("export") => {
                let format: ExportFormat = args.get(1).copied().unwrap_or("json").parse()?;
                Ok(CommandOutput::Text(state.history.export(format)?))
            },
            Some(n) => match n.parse::<usize>() {
                Ok(n) => Ok(list_history(state, Some(n))),
                Err(_) => Err(DevtermError::usage(self.usage())),
            },
        }
    }
}

fn list_history(state: &ShellState, last: Option<usize>) -> CommandOutput {
    let total = state.history.len();
    let skip = last.map_or(0, |n| total.saturating_sub(n));
    let lines: Vec<String> = state
        .history
        .entries()
        .enumerate()
        .skip(skip)
        .map(|(i, e)| format!("{:>5}  {}", i + 1, e.command))
        .collect();
    CommandOutput::Text(lines.join("\n"))
}

// ---------------------------------------------------------------------------
// date
// ---------------------------------------------------------------------------

struct DateCmd;
impl Command for DateCmd {
    fn name(&self) -> &str {
        "date"
    }
    fn description(&self) -> &str {
        "Print current date and time (UTC)"
    }
    fn usage(&self) -> &str {
        "date [+FORMAT]"
    }
    fn execute(&self, args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        let now = now_ms();
        let Some(fmt) = args.first().and_then(|a| a.strip_prefix('+')) else {
            return Ok(CommandOutput::Text(format!("{} UTC", format_ms(now))));
        };
        let items: Vec<Item<'_>> = StrftimeItems::new(fmt).collect();
        if items.iter().any(|i| matches!(i, Item::Error)) {
            return Err(DevtermError::Command(format!("date: invalid format '{fmt}'")));
        }
        Ok(CommandOutput::Text(
            to_datetime(now).format_with_items(items.into_iter()).to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// whoami / hostname / uname
// ---------------------------------------------------------------------------

struct WhoamiCmd;
impl Command for WhoamiCmd {
    fn name(&self) -> &str {
        "whoami"
    }
    fn description(&self) -> &str {
        "Print current user name"
    }
    fn usage(&self) -> &str {
        "whoami"
    }
    fn execute(&self, _args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(state.user.clone()))
    }
}

struct HostnameCmd;
impl Command for HostnameCmd {
    fn name(&self) -> &str {
        "hostname"
    }
    fn description(&self) -> &str {
        "Print system hostname"
    }
    fn usage(&self) -> &str {
        "hostname"
    }
    fn execute(&self, _args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(state.hostname.clone()))
    }
}

struct UnameCmd;
impl Command for UnameCmd {
    fn name(&self) -> &str {
        "uname"
    }
    fn description(&self) -> &str {
        "Print system information"
    }
    fn usage(&self) -> &str {
        "uname [-a|-s|-n|-r|-m]"
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let all = has_flag(args, 'a', "all");
        let mut parts = Vec::new();
        if all || args.is_empty() || has_flag(args, 's', "kernel-name") {
            parts.push("Linux".to_string());
        }
        if all || has_flag(args, 'n', "nodename") {
            parts.push(state.hostname.clone());
        }
        if all || has_flag(args, 'r', "kernel-release") {
            parts.push(KERNEL.to_string());
        }
        if all || has_flag(args, 'm', "machine") {
            parts.push("x86_64".to_string());
        }
        if all {
            parts.push("GNU/Linux".to_string());
        }
        if parts.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        Ok(CommandOutput::Text(parts.join(" ")))
    }
}

// ---------------------------------------------------------------------------
// sleep
// ---------------------------------------------------------------------------

fn sleep_secs(args: &[&str]) -> Result<f64> {
    let arg = args
        .first()
        .ok_or_else(|| DevtermError::usage("sleep <seconds>"))?;
    let secs: f64 = arg
        .trim_end_matches('s')
        .parse()
        .map_err(|_| DevtermError::Command(format!("sleep: invalid time interval '{arg}'")))?;
    if !(0.0..=MAX_SLEEP_SECS).contains(&secs) {
        return Err(DevtermError::Command(format!(
            "sleep: interval must be between 0 and {MAX_SLEEP_SECS}s"
        )));
    }
    Ok(secs)
}

struct SleepCmd;
impl Command for SleepCmd {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Pause for a number of seconds"
    }
    fn usage(&self) -> &str {
        "sleep <seconds>"
    }
    fn latency(&self, args: &[&str]) -> Duration {
        sleep_secs(args).map_or(Duration::ZERO, Duration::from_secs_f64)
    }
    fn execute(&self, args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        sleep_secs(args)?;
        Ok(CommandOutput::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Category;
    use devterm_history::HistoryMeta;

    fn setup() -> (CommandRegistry, ShellState) {
        (CommandRegistry::with_builtins(), ShellState::in_memory().unwrap())
    }

    fn exec(reg: &CommandRegistry, state: &mut ShellState, line: &str) -> Result<CommandOutput> {
        reg.execute(line, state)
    }

    fn text(out: CommandOutput) -> String {
        match out {
            CommandOutput::Text(s) => s,
            other => other.render(),
        }
    }

    #[test]
    fn echo_joins() {
        let (reg, mut st) = setup();
        assert_eq!(text(exec(&reg, &mut st, "echo hello   world").unwrap()), "hello world");
        assert_eq!(text(exec(&reg, &mut st, "echo -n x").unwrap()), "x");
    }

    #[test]
    fn clear_and_cls() {
        let (reg, mut st) = setup();
        assert_eq!(exec(&reg, &mut st, "clear").unwrap(), CommandOutput::Clear);
        assert_eq!(exec(&reg, &mut st, "CLS").unwrap(), CommandOutput::Clear);
    }

    #[test]
    fn export_and_unset() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "export API_URL=http://localhost:3000 DEBUG=1").unwrap();
        assert_eq!(st.environment["API_URL"], "http://localhost:3000");
        assert!(text(exec(&reg, &mut st, "env").unwrap()).contains("DEBUG=1"));
        exec(&reg, &mut st, "unset DEBUG").unwrap();
        assert!(!st.environment.contains_key("DEBUG"));
        assert!(exec(&reg, &mut st, "unset").is_err());
    }

    #[test]
    fn export_rejects_bad_names_atomically() {
        let (reg, mut st) = setup();
        assert!(exec(&reg, &mut st, "export GOOD=1 1BAD=2").is_err());
        assert!(!st.environment.contains_key("GOOD"));
    }

    #[test]
    fn alias_lifecycle() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "alias gs='git status'").unwrap();
        assert_eq!(st.aliases["gs"], "git status");
        assert_eq!(text(exec(&reg, &mut st, "alias gs").unwrap()), "alias gs='git status'");
        assert_eq!(text(exec(&reg, &mut st, "alias").unwrap()), "alias gs='git status'");
        exec(&reg, &mut st, "unalias gs").unwrap();
        assert!(st.aliases.is_empty());
        assert!(exec(&reg, &mut st, "unalias gs").is_err());
    }

    #[test]
    fn alias_expansion_runs_target() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "alias say='echo hi'").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "say there").unwrap()), "hi there");
    }

    #[test]
    fn history_lists_and_clears() {
        let (reg, mut st) = setup();
        st.history.add("ls", HistoryMeta::success(1, ""));
        st.history.add("pwd", HistoryMeta::success(1, ""));
        let out = text(exec(&reg, &mut st, "history").unwrap());
        assert_eq!(out, "    1  ls\n    2  pwd");
        assert_eq!(text(exec(&reg, &mut st, "history 1").unwrap()), "    2  pwd");
        assert!(text(exec(&reg, &mut st, "history search pw").unwrap()).contains("pwd"));
        exec(&reg, &mut st, "history -c").unwrap();
        assert!(st.history.is_empty());
    }

    #[test]
    fn history_export_json() {
        let (reg, mut st) = setup();
        st.history.add("ls", HistoryMeta::success(1, ""));
        let json = text(exec(&reg, &mut st, "history export json").unwrap());
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["command"], "ls");
        assert!(exec(&reg, &mut st, "history export xml").is_err());
    }

    #[test]
    fn date_formats() {
        let (reg, mut st) = setup();
        assert!(text(exec(&reg, &mut st, "date").unwrap()).ends_with("UTC"));
        let year = text(exec(&reg, &mut st, "date +%Y").unwrap());
        assert_eq!(year.len(), 4);
        assert!(exec(&reg, &mut st, "date +%Q").is_err());
    }

    #[test]
    fn identity_commands() {
        let (reg, mut st) = setup();
        assert_eq!(text(exec(&reg, &mut st, "whoami").unwrap()), "developer");
        assert_eq!(text(exec(&reg, &mut st, "hostname").unwrap()), "devterm");
        assert_eq!(text(exec(&reg, &mut st, "uname").unwrap()), "Linux");
        assert!(text(exec(&reg, &mut st, "uname -a").unwrap()).contains("devterm"));
    }

    #[test]
    fn sleep_validates() {
        let (reg, mut st) = setup();
        assert!(exec(&reg, &mut st, "sleep").is_err());
        assert!(exec(&reg, &mut st, "sleep abc").is_err());
        assert!(exec(&reg, &mut st, "sleep -1").is_err());
        assert_eq!(exec(&reg, &mut st, "sleep 0.5").unwrap(), CommandOutput::None);
        assert_eq!(
            reg.latency(&["sleep".to_string(), "2".to_string()]),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn help_lists_categories_with_counts() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "help").unwrap());
        assert!(out.contains("file"));
        assert!(out.contains("vcs"));
        assert!(out.contains("ai"));
        let utility = text(exec(&reg, &mut st, "help utility").unwrap());
        assert!(utility.contains("echo"));
        let one = text(exec(&reg, &mut st, "help clear").unwrap());
        assert!(one.contains("Aliases: cls"));
        assert_eq!(reg.categories().len(), Category::ALL.len());
    }

    #[test]
    fn which_resolves_aliases() {
        let (reg, mut st) = setup();
        assert!(text(exec(&reg, &mut st, "which cls").unwrap()).contains("alias for clear"));
        assert!(text(exec(&reg, &mut st, "which ls").unwrap()).starts_with("/usr/bin/ls"));
        assert!(exec(&reg, &mut st, "which zzz").is_err());
        assert!(exec(&reg, &mut st, "which").is_err());
    }

    #[test]
    fn registry_has_full_command_set() {
        let reg = CommandRegistry::with_builtins();
        assert!(reg.len() >= 55, "only {} commands", reg.len());
    }
}
