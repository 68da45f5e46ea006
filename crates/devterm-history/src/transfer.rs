//! History export and import.

use chrono::NaiveDateTime;
use devterm_types::error::{DevtermError, Result};
use devterm_types::format::{ExportFormat, csv_record};
use devterm_types::time::{format_ms, new_id, now_ms};

use crate::entry::HistoryEntry;
use crate::store::HistoryStore;

const CSV_HEADER: &str = "timestamp,command,executionTime,exitCode";

impl HistoryStore {
    /// Serialize every entry in `format`.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let out = match format {
            ExportFormat::Json => {
                let list: Vec<&HistoryEntry> = self.entries().collect();
                serde_json::to_string_pretty(&list)?
            },
            ExportFormat::Csv => {
                let mut lines = vec![CSV_HEADER.to_string()];
                for e in self.entries() {
                    lines.push(csv_record([
                        e.timestamp.to_string(),
                        e.command.clone(),
                        e.execution_time.map(|t| t.to_string()).unwrap_or_default(),
                        e.exit_code.map(|c| c.to_string()).unwrap_or_default(),
                    ]));
                }
                lines.join("\n")
            },
            ExportFormat::Text => self
                .entries()
                .map(|e| format!("[{}] {}", format_ms(e.timestamp), e.command))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        log::info!("exported {} history entries as {format}", self.len());
        Ok(out)
    }

    /// Import entries from `data`. JSON entries keep their ids and are added
    /// only when the id is new; text lines become fresh entries. Returns the
    /// number of entries added.
    pub fn import(&mut self, data: &str, format: ExportFormat) -> Result<usize> {
        let incoming = match format {
            ExportFormat::Json => serde_json::from_str::<Vec<HistoryEntry>>(data)
                .map_err(|e| DevtermError::ImportValidation(e.to_string()))?,
            ExportFormat::Text => data.lines().filter_map(parse_text_line).collect(),
            ExportFormat::Csv => {
                return Err(DevtermError::ImportValidation(
                    "CSV history cannot be imported".into(),
                ));
            },
        };
        let added = self.merge(incoming);
        log::info!("imported {added} history entries from {format}");
        Ok(added)
    }
}

/// `[YYYY-MM-DD HH:MM:SS] command` keeps its timestamp; any other
/// non-blank line is a command run now.
fn parse_text_line(line: &str) -> Option<HistoryEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (timestamp, command) = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once("] "))
        .and_then(|(stamp, cmd)| {
            NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| (dt.and_utc().timestamp_millis(), cmd.trim()))
        })
        .unwrap_or((now_ms(), line));
    if command.is_empty() {
        return None;
    }
    Some(HistoryEntry {
        id: new_id(),
        command: command.to_string(),
        timestamp,
        execution_time: None,
        exit_code: None,
        output: None,
        error: None,
    })
}
