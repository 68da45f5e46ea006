//! Mutable per-session shell state handed to every command.

use std::collections::BTreeMap;
use std::fmt;

use devterm_history::HistoryStore;
use devterm_syntax::Highlighter;
use devterm_types::config::EngineConfig;
use devterm_types::error::{DevtermError, Result};
use devterm_types::time::now_ms;
use devterm_vfs::{MemoryVfs, resolve_path};

use crate::enhance::{CodeEnhancer, OfflineEnhancer};
use crate::process::ProcessTable;
use crate::repo::Repository;

pub const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
pub const SHELL: &str = "/bin/devsh";

/// Everything a command may read or mutate.
pub struct ShellState {
    pub cwd: String,
    pub home: String,
    pub user: String,
    pub hostname: String,
    pub vfs: MemoryVfs,
    pub environment: BTreeMap<String, String>,
    /// User aliases (`alias ll='ls -l'`).
    pub aliases: BTreeMap<String, String>,
    pub history: HistoryStore,
    pub processes: ProcessTable,
    /// Repositories keyed by their root directory.
    pub repos: BTreeMap<String, Repository>,
    pub highlighter: Highlighter,
    pub enhancer: Box<dyn CodeEnhancer>,
    pub last_exit_code: i32,
    pub started_at: i64,
}

impl fmt::Debug for ShellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellState")
            .field("cwd", &self.cwd)
            .field("user", &self.user)
            .field("vfs_entries", &self.vfs.len())
            .field("history", &self.history.len())
            .field("last_exit_code", &self.last_exit_code)
            .finish_non_exhaustive()
    }
}

impl ShellState {
    /// A fresh shell over the scaffolded project, starting in
    /// `~/project`.
    pub fn new(config: &EngineConfig, history: HistoryStore) -> Result<Self> {
        let user = config.dispatcher.user.clone();
        let home = format!("/home/{user}");
        let cwd = format!("{home}/project");
        let vfs = MemoryVfs::with_scaffold(&user)?;

        let mut environment = BTreeMap::new();
        for (key, value) in [
            ("HOME", home.as_str()),
            ("USER", user.as_str()),
            ("SHELL", SHELL),
            ("PATH", DEFAULT_PATH),
            ("NODE_ENV", "development"),
            ("TERM", "xterm-256color"),
            ("HOSTNAME", config.dispatcher.hostname.as_str()),
            ("PWD", cwd.as_str()),
        ] {
            environment.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            cwd,
            home,
            user,
            hostname: config.dispatcher.hostname.clone(),
            vfs,
            environment,
            aliases: BTreeMap::new(),
            history,
            processes: ProcessTable::new(),
            repos: BTreeMap::new(),
            highlighter: Highlighter::new(config.syntax.cache_capacity)?,
            enhancer: Box::new(OfflineEnhancer),
            last_exit_code: 0,
            started_at: now_ms(),
        })
    }

    /// Default configuration with an in-memory history.
    pub fn in_memory() -> Result<Self> {
        Self::new(&EngineConfig::default(), HistoryStore::in_memory())
    }

    /// Replace the code enhancer used by `enhance`.
    pub fn with_enhancer(mut self, enhancer: Box<dyn CodeEnhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// Absolute, normalized form of a user-supplied path.
    pub fn resolve(&self, input: &str) -> String {
        resolve_path(&self.cwd, &self.home, input)
    }

    /// Change directory, keeping `PWD`/`OLDPWD` in sync.
    pub fn set_cwd(&mut self, path: String) {
        let old = std::mem::replace(&mut self.cwd, path);
        self.environment.insert("OLDPWD".to_string(), old);
        self.environment.insert("PWD".to_string(), self.cwd.clone());
    }

    /// Read a file named relative to the cwd. Returns the absolute path and
    /// content.
    pub fn read_file(&mut self, input: &str) -> Result<(String, String)> {
        let path = self.resolve(input);
        let content = self.vfs.read_to_string(&path)?;
        Ok((path, content))
    }

    /// `~`-abbreviated cwd for prompts.
    pub fn display_cwd(&self) -> String {
        match self.cwd.strip_prefix(&self.home) {
            Some("") => "~".to_string(),
            Some(rest) if rest.starts_with('/') => format!("~{rest}"),
            _ => self.cwd.clone(),
        }
    }

    /// Prompt string, e.g. `developer@devterm:~/project$ `.
    pub fn prompt(&self) -> String {
        format!("{}@{}:{}$ ", self.user, self.hostname, self.display_cwd())
    }

    /// Root of the repository containing the cwd, if any.
    pub fn repo_root(&self) -> Option<String> {
        let mut dir = self.cwd.as_str();
        loop {
            if self.repos.contains_key(dir) {
                return Some(dir.to_string());
            }
            if dir == "/" {
                return None;
            }
            dir = devterm_vfs::parent(dir);
        }
    }

    /// Project directory holding the nearest `package.json`, walking up
    /// from the cwd.
    pub fn project_root(&self) -> Result<String> {
        let mut dir = self.cwd.as_str();
        loop {
            let manifest = if dir == "/" {
                "/package.json".to_string()
            } else {
                format!("{dir}/package.json")
            };
            if self.vfs.peek(&manifest).is_some_and(|e| e.is_file()) {
                return Ok(dir.to_string());
            }
            if dir == "/" {
                return Err(DevtermError::Command(
                    "no package.json found in this directory or any parent".to_string(),
                ));
            }
            dir = devterm_vfs::parent(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_project() {
        let state = ShellState::in_memory().unwrap();
        assert_eq!(state.cwd, "/home/developer/project");
        assert_eq!(state.environment["PWD"], state.cwd);
        assert_eq!(state.prompt(), "developer@devterm:~/project$ ");
    }

    #[test]
    fn set_cwd_tracks_oldpwd() {
        let mut state = ShellState::in_memory().unwrap();
        state.set_cwd("/tmp".to_string());
        assert_eq!(state.environment["PWD"], "/tmp");
        assert_eq!(state.environment["OLDPWD"], "/home/developer/project");
        assert_eq!(state.display_cwd(), "/tmp");
    }

    #[test]
    fn project_root_walks_up() {
        let mut state = ShellState::in_memory().unwrap();
        state.set_cwd("/home/developer/project/src".to_string());
        assert_eq!(state.project_root().unwrap(), "/home/developer/project");
        state.set_cwd("/tmp".to_string());
        assert!(state.project_root().is_err());
    }

    #[test]
    fn resolve_relative_and_home() {
        let state = ShellState::in_memory().unwrap();
        assert_eq!(state.resolve("src/../README.md"), "/home/developer/project/README.md");
        assert_eq!(state.resolve("~"), "/home/developer");
    }
}
