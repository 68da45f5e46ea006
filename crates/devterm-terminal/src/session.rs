//! Sessions and tabs.
//!
//! A [`Session`] is the persisted unit: its tabs (each with an output log and
//! a history slice), the consolidated history, the environment and aliases.
//! [`TerminalSession`] pairs a session with the live [`ShellState`] and keeps
//! the two in sync as lines are submitted.

use std::collections::BTreeMap;

use devterm_history::{HistoryCursor, HistoryEntry};
use devterm_types::error::{DevtermError, Result};
use devterm_types::format::{ExportFormat, csv_record};
use devterm_types::output::OutputEntry;
use devterm_types::store::Store;
use devterm_types::time::{format_clock, format_ms, new_id, now_ms};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::state::ShellState;

/// One command/output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub name: String,
    pub output: Vec<OutputEntry>,
    pub history: Vec<HistoryEntry>,
    pub created_at: i64,
    #[serde(skip)]
    cursor: HistoryCursor,
}

impl Tab {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            output: Vec::new(),
            history: Vec::new(),
            created_at: now_ms(),
            cursor: HistoryCursor::reset(),
        }
    }

    /// Append entries to the log. A `clear` signal truncates the log instead
    /// of being stored.
    pub fn push_output(&mut self, entries: &[OutputEntry]) {
        for entry in entries {
            if entry.metadata_str("action") == Some("clear") {
                self.output.clear();
            } else {
                self.output.push(entry.clone());
            }
        }
    }
}

/// The persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub tabs: Vec<Tab>,
    pub history: Vec<HistoryEntry>,
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Session {
    /// A session with one empty tab.
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            name: name.into(),
            tabs: vec![Tab::new("Terminal 1")],
            history: Vec::new(),
            environment: BTreeMap::new(),
            aliases: BTreeMap::new(),
            cwd: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tab_mut(&mut self, id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }

    /// Serialize the session in `format`.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let out = match format {
            ExportFormat::Json => serde_json::to_string_pretty(self)?,
            ExportFormat::Csv => self.export_csv(),
            ExportFormat::Text => self.export_text(),
        };
        log::info!(
            "exported session {} ({} tabs, {} history entries) as {format}",
            self.id,
            self.tabs.len(),
            self.history.len()
        );
        Ok(out)
    }

    fn export_csv(&self) -> String {
        let mut lines = vec![
            csv_record(["id", "name", "createdAt", "updatedAt"]),
            csv_record([
                self.id.clone(),
                self.name.clone(),
                self.created_at.to_string(),
                self.updated_at.to_string(),
            ]),
            String::new(),
            csv_record(["tabId", "tabName", "outputCount", "historyCount"]),
        ];
        for tab in &self.tabs {
            lines.push(csv_record([
                tab.id.clone(),
                tab.name.clone(),
                tab.output.len().to_string(),
                tab.history.len().to_string(),
            ]));
        }
        lines.push(String::new());
        lines.push(csv_record(["timestamp", "command", "executionTime", "exitCode"]));
        for e in &self.history {
            lines.push(csv_record([
                e.timestamp.to_string(),
                e.command.clone(),
                e.execution_time.map(|t| t.to_string()).unwrap_or_default(),
                e.exit_code.map(|c| c.to_string()).unwrap_or_default(),
            ]));
        }
        lines.join("\n")
    }

    fn export_text(&self) -> String {
        let mut out = vec![
            format!("Session: {}", self.name),
            format!("Created: {}", format_ms(self.created_at)),
            format!("Updated: {}", format_ms(self.updated_at)),
        ];
        for tab in &self.tabs {
            out.push(String::new());
            out.push(format!("=== {} ===", tab.name));
            for entry in &tab.output {
                out.push(format!(
                    "[{}] {:<7} {}",
                    format_clock(entry.timestamp),
                    entry.level.as_str(),
                    entry.message
                ));
            }
        }
        if !self.history.is_empty() {
            out.push(String::new());
            out.push("=== History ===".to_string());
            for e in &self.history {
                let status = match e.exit_code {
                    Some(0) => "ok",
                    Some(_) => "failed",
                    None => "-",
                };
                out.push(format!("[{}] {} ({status})", format_ms(e.timestamp), e.command));
            }
        }
        out.join("\n")
    }

    /// Parse an exported session. Only JSON carries enough to rebuild one.
    /// The payload is checked as a whole before anything is accepted; the
    /// result gets a fresh id and `updatedAt`.
    pub fn import(data: &str, format: ExportFormat) -> Result<Self> {
        if format != ExportFormat::Json {
            return Err(DevtermError::ImportValidation(format!(
                "sessions can only be imported from json, not {format}"
            )));
        }
        let value: Value = serde_json::from_str(data)
            .map_err(|e| DevtermError::ImportValidation(format!("not valid JSON: {e}")))?;
        validate_payload(&value)?;
        let mut session: Session = serde_json::from_value(value)
            .map_err(|e| DevtermError::ImportValidation(e.to_string()))?;
        let original = std::mem::replace(&mut session.id, new_id());
        session.touch();
        log::info!(
            "imported session {original} as {} ({} tabs, {} history entries)",
            session.id,
            session.tabs.len(),
            session.history.len()
        );
        Ok(session)
    }

    pub fn load(store: &dyn Store<Session>) -> Result<Option<Self>> {
        store.load()
    }

    pub fn save(&self, store: &mut dyn Store<Session>) -> Result<()> {
        store.save(self)
    }
}

fn validate_payload(value: &Value) -> Result<()> {
    let Some(obj) = value.as_object() else {
        return Err(DevtermError::ImportValidation(
            "session must be a JSON object".to_string(),
        ));
    };
    let checks: [(&str, fn(&Value) -> bool, &str); 7] = [
        ("id", Value::is_string, "a string"),
        ("name", Value::is_string, "a string"),
        ("tabs", Value::is_array, "an array"),
        ("history", Value::is_array, "an array"),
        ("environment", Value::is_object, "an object"),
        ("createdAt", Value::is_number, "a number"),
        ("updatedAt", Value::is_number, "a number"),
    ];
    for (field, ok, expected) in checks {
        match obj.get(field) {
            None => {
                return Err(DevtermError::ImportValidation(format!(
                    "missing field `{field}`"
                )));
            },
            Some(v) if !ok(v) => {
                return Err(DevtermError::ImportValidation(format!(
                    "`{field}` must be {expected}"
                )));
            },
            Some(_) => {},
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Live session
// ---------------------------------------------------------------------------

/// A session bound to a running shell.
#[derive(Debug)]
pub struct TerminalSession {
    session: Session,
    state: ShellState,
    active: usize,
}

impl TerminalSession {
    pub fn new(name: impl Into<String>, state: ShellState) -> Self {
        let mut this = Self {
            session: Session::new(name),
            state,
            active: 0,
        };
        this.sync();
        this
    }

    /// Resume a stored or imported session on top of `state`: environment,
    /// aliases and working directory are restored, and the session history
    /// is merged into the shell history.
    pub fn restore(session: Session, mut state: ShellState) -> Result<Self> {
        state.environment.extend(session.environment.clone());
        state.aliases = session.aliases.clone();
        if let Some(cwd) = &session.cwd {
            if state.vfs.peek(cwd).is_some_and(|e| e.is_dir()) {
                state.set_cwd(cwd.clone());
            } else {
                log::warn!("saved working directory {cwd} no longer exists");
            }
        }
        let history = serde_json::to_string(&session.history)?;
        state.history.import(&history, ExportFormat::Json)?;
        let mut this = Self {
            session,
            state,
            active: 0,
        };
        if this.session.tabs.is_empty() {
            this.session.tabs.push(Tab::new("Terminal 1"));
        }
        this.sync();
        Ok(this)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    /// Detach the shell, dropping the session wrapper.
    pub fn into_state(self) -> ShellState {
        self.state
    }

    pub fn tab_ids(&self) -> Vec<&str> {
        self.session.tabs.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_tab(&self) -> &Tab {
        &self.session.tabs[self.active]
    }

    /// Run a line in the active tab and return what it printed.
    pub async fn submit(&mut self, dispatcher: &Dispatcher, line: &str) -> Vec<OutputEntry> {
        let before = self.state.history.last().map(|e| e.id.clone());
        let entries = dispatcher.execute(line, &mut self.state).await;

        let recorded = self
            .state
            .history
            .last()
            .filter(|e| Some(&e.id) != before.as_ref())
            .cloned();
        let tab = &mut self.session.tabs[self.active];
        tab.cursor = HistoryCursor::reset();
        tab.push_output(&entries);
        if let Some(entry) = recorded {
            tab.history.push(entry);
        }
        self.sync();
        entries
    }

    /// Recall an older command into the active tab's input.
    pub fn previous(&mut self) -> Option<String> {
        let tab = &mut self.session.tabs[self.active];
        let (cursor, command) = self.state.history.previous(tab.cursor);
        tab.cursor = cursor;
        command
    }

    /// Recall a newer command; past the newest this yields an empty line.
    pub fn next(&mut self) -> Option<String> {
        let tab = &mut self.session.tabs[self.active];
        let (cursor, command) = self.state.history.next(tab.cursor);
        tab.cursor = cursor;
        command
    }

    /// Open a tab and make it active. Returns its id.
    pub fn open_tab(&mut self, name: Option<&str>) -> String {
        let name = name.map_or_else(
            || format!("Terminal {}", self.session.tabs.len() + 1),
            str::to_string,
        );
        let tab = Tab::new(name);
        let id = tab.id.clone();
        self.session.tabs.push(tab);
        self.active = self.session.tabs.len() - 1;
        self.session.touch();
        id
    }

    pub fn switch_tab(&mut self, id: &str) -> Result<()> {
        let index = self.tab_index(id)?;
        self.active = index;
        Ok(())
    }

    /// Close a tab. The last remaining tab cannot be closed.
    pub fn close_tab(&mut self, id: &str) -> Result<()> {
        let index = self.tab_index(id)?;
        if self.session.tabs.len() == 1 {
            return Err(DevtermError::Command("cannot close the last tab".to_string()));
        }
        self.session.tabs.remove(index);
        if self.active >= index && self.active > 0 {
            self.active -= 1;
        }
        self.session.touch();
        Ok(())
    }

    pub fn rename_tab(&mut self, id: &str, name: &str) -> Result<()> {
        let index = self.tab_index(id)?;
        self.session.tabs[index].name = name.to_string();
        self.session.touch();
        Ok(())
    }

    fn tab_index(&self, id: &str) -> Result<usize> {
        self.session
            .tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DevtermError::Command(format!("no such tab: {id}")))
    }

    pub fn export(&self, format: ExportFormat) -> Result<String> {
        self.session.export(format)
    }

    fn sync(&mut self) {
        self.session.history = self.state.history.entries().cloned().collect();
        self.session.environment = self.state.environment.clone();
        self.session.aliases = self.state.aliases.clone();
        self.session.cwd = Some(self.state.cwd.clone());
        self.session.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devterm_types::config::EngineConfig;
    use devterm_types::output::OutputLevel;
    use devterm_types::store::{JsonFileStore, MemoryStore};

    fn setup() -> (Dispatcher, TerminalSession) {
        (
            Dispatcher::new(&EngineConfig::default()).unwrap(),
            TerminalSession::new("work", ShellState::in_memory().unwrap()),
        )
    }

    #[tokio::test]
    async fn submit_records_into_active_tab() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo one").await;
        ts.submit(&d, "zzzqux").await;
        let tab = ts.active_tab();
        assert_eq!(tab.output.len(), 2);
        assert_eq!(tab.output[1].level, OutputLevel::Error);
        assert_eq!(tab.history.len(), 2);
        assert_eq!(ts.session().history.len(), 2);
    }

    #[tokio::test]
    async fn blank_submit_adds_nothing() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo one").await;
        ts.submit(&d, "  ").await;
        assert_eq!(ts.active_tab().history.len(), 1);
    }

    #[tokio::test]
    async fn clear_truncates_tab_log() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo one").await;
        ts.submit(&d, "clear").await;
        assert!(ts.active_tab().output.is_empty());
        ts.submit(&d, "echo two").await;
        assert_eq!(ts.active_tab().output.len(), 1);
    }

    #[tokio::test]
    async fn tabs_keep_separate_logs() {
        let (d, mut ts) = setup();
        let first = ts.active_tab().id.clone();
        ts.submit(&d, "echo first").await;
        let second = ts.open_tab(None);
        ts.submit(&d, "echo second").await;
        assert_eq!(ts.active_tab().name, "Terminal 2");
        assert_eq!(ts.active_tab().output[0].message, "second");
        ts.switch_tab(&first).unwrap();
        assert_eq!(ts.active_tab().output[0].message, "first");
        assert_eq!(ts.session().history.len(), 2);

        ts.close_tab(&second).unwrap();
        assert!(ts.close_tab(&first).is_err());
        assert!(ts.switch_tab("nope").is_err());
    }

    #[tokio::test]
    async fn recall_walks_history_and_resets_on_submit() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo a").await;
        ts.submit(&d, "echo b").await;
        assert_eq!(ts.previous().as_deref(), Some("echo b"));
        assert_eq!(ts.previous().as_deref(), Some("echo a"));
        assert_eq!(ts.previous().as_deref(), Some("echo a"));
        assert_eq!(ts.next().as_deref(), Some("echo b"));
        assert_eq!(ts.next().as_deref(), Some(""));
        assert_eq!(ts.next(), None);

        ts.previous();
        ts.submit(&d, "echo c").await;
        assert_eq!(ts.previous().as_deref(), Some("echo c"));
    }

    #[tokio::test]
    async fn json_round_trip_preserves_content() {
        let (d, mut ts) = setup();
        ts.submit(&d, "export EDITOR=vim").await;
        ts.submit(&d, "alias gs='git status'").await;
        ts.submit(&d, "ls").await;
        let original = ts.session().clone();

        let json = ts.export(ExportFormat::Json).unwrap();
        let imported = Session::import(&json, ExportFormat::Json).unwrap();
        assert_ne!(imported.id, original.id);
        assert!(imported.updated_at >= original.updated_at);
        assert_eq!(imported.name, original.name);
        assert_eq!(imported.tabs, original.tabs);
        assert_eq!(imported.history, original.history);
        assert_eq!(imported.environment, original.environment);
        assert_eq!(imported.aliases, original.aliases);
        assert_eq!(imported.environment.get("EDITOR").map(String::as_str), Some("vim"));
    }

    #[test]
    fn import_rejects_bad_payloads() {
        let good = serde_json::to_value(Session::new("s")).unwrap();

        for field in ["id", "name", "tabs", "history", "environment", "createdAt", "updatedAt"] {
            let mut v = good.clone();
            v.as_object_mut().unwrap().remove(field);
            let err = Session::import(&v.to_string(), ExportFormat::Json).unwrap_err();
            assert!(matches!(err, DevtermError::ImportValidation(_)), "{field}");
        }

        let mut v = good.clone();
        v["createdAt"] = Value::String("yesterday".into());
        assert!(Session::import(&v.to_string(), ExportFormat::Json).is_err());

        let mut v = good.clone();
        v["environment"] = Value::Array(Vec::new());
        assert!(Session::import(&v.to_string(), ExportFormat::Json).is_err());

        assert!(Session::import("[1,2]", ExportFormat::Json).is_err());
        assert!(Session::import("{", ExportFormat::Json).is_err());
        assert!(Session::import(&good.to_string(), ExportFormat::Csv).is_err());
    }

    #[test]
    fn import_without_optional_fields() {
        let mut v = serde_json::to_value(Session::new("s")).unwrap();
        let obj = v.as_object_mut().unwrap();
        obj.remove("aliases");
        obj.remove("cwd");
        let session = Session::import(&v.to_string(), ExportFormat::Json).unwrap();
        assert!(session.aliases.is_empty());
        assert_eq!(session.cwd, None);
    }

    #[tokio::test]
    async fn csv_export_has_three_sections() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo \"a, b\"").await;
        let csv = ts.export(ExportFormat::Csv).unwrap();
        let sections: Vec<&str> = csv.split("\n\n").collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("id,name,createdAt,updatedAt\n"));
        assert!(sections[1].starts_with("tabId,tabName,outputCount,historyCount\n"));
        assert!(sections[1].ends_with(",Terminal 1,1,1"));
        assert!(sections[2].contains(",\"echo \"\"a, b\"\"\","));
    }

    #[tokio::test]
    async fn text_export_is_a_transcript() {
        let (d, mut ts) = setup();
        ts.submit(&d, "echo hi").await;
        ts.submit(&d, "zzzqux").await;
        let text = ts.export(ExportFormat::Text).unwrap();
        assert!(text.starts_with("Session: work\n"));
        assert!(text.contains("=== Terminal 1 ==="));
        assert!(text.contains("success hi"));
        assert!(text.contains("echo hi (ok)"));
        assert!(text.contains("zzzqux (failed)"));
    }

    #[tokio::test]
    async fn restore_brings_back_shell_state() {
        let (d, mut ts) = setup();
        ts.submit(&d, "export EDITOR=vim").await;
        ts.submit(&d, "alias ll2='ls -l'").await;
        ts.submit(&d, "cd src").await;
        let json = ts.export(ExportFormat::Json).unwrap();

        let session = Session::import(&json, ExportFormat::Json).unwrap();
        let mut restored =
            TerminalSession::restore(session, ShellState::in_memory().unwrap()).unwrap();
        assert_eq!(restored.state().cwd, "/home/developer/project/src");
        assert_eq!(
            restored.state().environment.get("EDITOR").map(String::as_str),
            Some("vim")
        );
        assert!(restored.state().aliases.contains_key("ll2"));
        assert_eq!(restored.state().history.len(), 3);
        assert_eq!(restored.previous().as_deref(), Some("cd src"));
    }

    #[tokio::test]
    async fn session_persists_through_store() {
        let (d, mut ts) = setup();
        ts.submit(&d, "pwd").await;
        let mut store: MemoryStore<Session> = MemoryStore::new();
        ts.session().save(&mut store).unwrap();
        let loaded = Session::load(&store).unwrap().unwrap();
        assert_eq!(&loaded, ts.session());
    }

    #[tokio::test]
    async fn session_survives_file_store() {
        let (d, mut ts) = setup();
        ts.submit(&d, "export EDITOR=vim").await;
        let dir = tempfile::tempdir().unwrap();
        let mut store: JsonFileStore<Session> = JsonFileStore::new(dir.path().join("session.json"));
        assert!(Session::load(&store).unwrap().is_none());
        ts.session().save(&mut store).unwrap();
        let loaded = Session::load(&store).unwrap().unwrap();
        assert_eq!(loaded.environment, ts.session().environment);
        assert_eq!(loaded.history, ts.session().history);
    }
}
