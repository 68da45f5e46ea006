//! Simulated process table for `ps`, `kill`, `top` and the dev servers.

use std::collections::BTreeMap;

use devterm_types::time::now_ms;

/// PID of the shell itself. It cannot be killed.
pub const SHELL_PID: u32 = 1;
const FIRST_USER_PID: u32 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub pid: u32,
    pub name: String,
    pub command: String,
    pub started_at: i64,
    /// Listening port for servers.
    pub port: Option<u16>,
    pub cpu: f32,
    pub mem_mb: u32,
}

impl Process {
    pub fn is_background(&self) -> bool {
        self.pid != SHELL_PID
    }
}

#[derive(Debug, Clone)]
pub struct ProcessTable {
    next_pid: u32,
    procs: BTreeMap<u32, Process>,
}

impl ProcessTable {
    /// A table holding only the shell process.
    pub fn new() -> Self {
        let mut procs = BTreeMap::new();
        procs.insert(
            SHELL_PID,
            Process {
                pid: SHELL_PID,
                name: "devsh".to_string(),
                command: "devsh --login".to_string(),
                started_at: now_ms(),
                port: None,
                cpu: 0.1,
                mem_mb: 4,
            },
        );
        Self {
            next_pid: FIRST_USER_PID,
            procs,
        }
    }

    /// Start a simulated process and return its pid.
    pub fn spawn(&mut self, name: &str, command: &str, port: Option<u16>) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        // Deterministic but varied load figures.
        let seed = command.bytes().fold(pid, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        self.procs.insert(
            pid,
            Process {
                pid,
                name: name.to_string(),
                command: command.to_string(),
                started_at: now_ms(),
                port,
                cpu: (seed % 150) as f32 / 10.0,
                mem_mb: 40 + seed % 200,
            },
        );
        log::debug!("spawned pid {pid}: {command}");
        pid
    }

    /// Stop a process. The shell itself is never removed.
    pub fn kill(&mut self, pid: u32) -> Option<Process> {
        if pid == SHELL_PID {
            return None;
        }
        self.procs.remove(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn find_by_port(&self, port: u16) -> Option<&Process> {
        self.procs.values().find(|p| p.port == Some(port))
    }

    pub fn find_by_name(&self, name: &str) -> Vec<&Process> {
        self.procs.values().filter(|p| p.name == name).collect()
    }

    /// All processes in pid order.
    pub fn list(&self) -> impl Iterator<Item = &Process> {
        self.procs.values()
    }

    /// Processes started from this shell.
    pub fn jobs(&self) -> impl Iterator<Item = &Process> {
        self.procs.values().filter(|p| p.is_background())
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
