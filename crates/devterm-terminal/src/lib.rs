//! Command interpreter and terminal subsystem.
//!
//! The terminal is a registry-based dispatch system. Commands implement the
//! `Command` trait and are registered by name. The `Dispatcher` screens and
//! expands input lines, resolves the command name, runs the handler under a
//! timeout and records the result in history. Sessions group tabs and can be
//! exported and imported.

mod ai_commands;
mod commands;
mod dev_commands;
pub mod dispatcher;
mod enhance;
mod file_commands;
mod interpreter;
mod package_commands;
pub mod parser;
mod process;
mod repo;
mod security;
pub mod session;
mod state;
mod system_commands;
mod vcs_commands;

/// Register AI helpers (ai, explain, enhance, highlight) into a registry.
pub use ai_commands::register_ai_commands;
/// Register shell utilities (echo, env, export, alias, history, ...) into a registry.
pub use commands::register_utility_commands;
/// Register build, server, test and lint tools into a registry.
pub use dev_commands::register_dev_commands;
/// Async line dispatcher with security screening and timeouts.
pub use dispatcher::Dispatcher;
/// Pluggable code enhancement used by `enhance` and `eslint --fix`.
pub use enhance::{CodeEnhancer, OfflineEnhancer};
/// Register file system commands into a registry.
pub use file_commands::register_file_commands;
/// A single executable command trait and its grouping.
pub use interpreter::{Category, Command};
/// Output produced by a command (text, lines, table, signals).
pub use interpreter::CommandOutput;
/// Registry of available commands.
pub use interpreter::CommandRegistry;
/// Register npm/yarn/pnpm/pip into a registry.
pub use package_commands::register_package_commands;
/// Tokenized command line.
pub use parser::ParsedLine;
/// Simulated process table.
pub use process::{Process, ProcessTable};
/// Simulated git repository.
pub use repo::{Commit, Repository};
/// Pre-dispatch screening of command lines.
pub use security::SecurityPolicy;
/// Persisted session, its tabs, and a session bound to a live shell.
pub use session::{Session, Tab, TerminalSession};
/// Mutable shell state passed to every command.
pub use state::ShellState;
/// Register process and network commands into a registry.
pub use system_commands::register_system_commands;
/// Register `git` into a registry.
pub use vcs_commands::register_vcs_commands;
