//! devterm entry point.
//!
//! Line-mode front end over the engine: reads commands from stdin, runs them
//! through the dispatcher and prints the entries they produce. Lines starting
//! with `:` are front-end commands (`:help` lists them). `exit`, `quit` or end
//! of input leaves; the session and history are saved under the data
//! directory (`DEVTERM_HOME`, default `.devterm`).

mod meta;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use devterm_history::{HistoryEntry, HistoryStore};
use devterm_terminal::{Dispatcher, Session, ShellState, TerminalSession};
use devterm_types::config::EngineConfig;
use devterm_types::output::{OutputEntry, OutputLevel};
use devterm_types::store::{JsonFileStore, MemoryStore, Store};

use meta::MetaCommand;

struct Paths {
    config: PathBuf,
    history: PathBuf,
    session: PathBuf,
}

impl Paths {
    /// Config comes from the first argument, `DEVTERM_CONFIG`, or
    /// `<data>/devterm.toml`.
    fn resolve() -> Self {
        let data = std::env::var_os("DEVTERM_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".devterm"));
        let config = std::env::args()
            .nth(1)
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("DEVTERM_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| data.join("devterm.toml"));
        Self {
            config,
            history: data.join("history.json"),
            session: data.join("session.json"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ShellState is single-threaded; everything runs on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run())
}

async fn run() -> Result<()> {
    let paths = Paths::resolve();
    let config = EngineConfig::load(&paths.config)
        .with_context(|| format!("loading {}", paths.config.display()))?;
    log::info!(
        "Starting devterm (timeout {}ms, latency simulation {})",
        config.dispatcher.command_timeout_ms,
        if config.dispatcher.simulate_latency { "on" } else { "off" },
    );

    let history = HistoryStore::open(
        &config.history,
        Box::new(JsonFileStore::<Vec<HistoryEntry>>::new(&paths.history)),
        Box::new(MemoryStore::<Vec<HistoryEntry>>::new()),
    );
    let state = ShellState::new(&config, history)?;
    let dispatcher = Dispatcher::new(&config)?;

    let mut session_store: JsonFileStore<Session> = JsonFileStore::new(&paths.session);
    let terminal = match Session::load(&session_store) {
        Ok(Some(session)) => {
            log::info!("resuming session {}", session.name);
            TerminalSession::restore(session, state)?
        },
        Ok(None) => TerminalSession::new("default", state),
        Err(e) => {
            log::warn!("ignoring saved session: {e}");
            TerminalSession::new("default", state)
        },
    };
    let mut terminal = Some(terminal);

    println!("devterm: type 'help' for commands, ':help' for tabs and export, 'exit' to quit");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if let Some(term) = &terminal {
            print!("{}", term.state().prompt());
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let trimmed = line.trim();
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        if let Some(rest) = trimmed.strip_prefix(':') {
            match MetaCommand::parse(rest).and_then(|cmd| meta::run(cmd, &mut terminal, &dispatcher))
            {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("{e:#}"),
            }
        } else if let Some(term) = terminal.as_mut() {
            for entry in term.submit(&dispatcher, &line).await {
                print_entry(&entry);
            }
        }

        if let Some(term) = &terminal
            && let Err(e) = session_store.save(term.session())
        {
            log::warn!("failed to save session: {e}");
        }
    }
    Ok(())
}

fn print_entry(entry: &OutputEntry) {
    match entry.level {
        OutputLevel::System if entry.metadata_str("action") == Some("clear") => {
            print!("\x1b[2J\x1b[H");
        },
        OutputLevel::Error => eprintln!("{}", entry.message),
        OutputLevel::Warning => println!("warning: {}", entry.message),
        _ => println!("{}", entry.message),
    }
}
