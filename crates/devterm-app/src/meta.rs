//! Front-end commands: lines starting with `:` are handled here instead of
//! being sent to the dispatcher.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use devterm_terminal::{Dispatcher, Session, TerminalSession};
use devterm_types::format::ExportFormat;

/// A parsed `:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Tabs,
    NewTab(Option<String>),
    SwitchTab(usize),
    CloseTab(usize),
    RenameTab(String),
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Import(PathBuf),
    Complete(String),
}

pub const HELP: &str = "\
:tabs                      list tabs
:tab new [name]            open a tab
:tab <n>                   switch to tab n
:tab close <n>             close tab n
:tab rename <name>         rename the active tab
:export <json|csv|txt> [file]
:import <file>             replace the session with an exported one
:complete <text>           show completions for text";

impl MetaCommand {
    /// Parse the text after the leading `:`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut words = input.split_whitespace();
        let cmd = match words.next() {
            None | Some("help") => Self::Help,
            Some("tabs") => Self::Tabs,
            Some("tab") => match words.next() {
                Some("new") => {
                    let name = words.collect::<Vec<_>>().join(" ");
                    Self::NewTab((!name.is_empty()).then_some(name))
                },
                Some("close") => Self::CloseTab(tab_number(words.next())?),
                Some("rename") => {
                    let name = words.collect::<Vec<_>>().join(" ");
                    if name.is_empty() {
                        bail!("usage: :tab rename <name>");
                    }
                    Self::RenameTab(name)
                },
                other => Self::SwitchTab(tab_number(other)?),
            },
            Some("export") => {
                let format = words
                    .next()
                    .ok_or_else(|| anyhow!("usage: :export <json|csv|txt> [file]"))?
                    .parse::<ExportFormat>()?;
                Self::Export {
                    format,
                    path: words.next().map(PathBuf::from),
                }
            },
            Some("import") => Self::Import(PathBuf::from(
                words.next().ok_or_else(|| anyhow!("usage: :import <file>"))?,
            )),
            Some("complete") => {
                let rest = input.trim_start().strip_prefix("complete").unwrap_or_default();
                Self::Complete(rest.trim_start().to_string())
            },
            Some(other) => bail!("unknown front-end command :{other} (try :help)"),
        };
        Ok(cmd)
    }
}

fn tab_number(word: Option<&str>) -> Result<usize> {
    let word = word.ok_or_else(|| anyhow!("missing tab number"))?;
    let n: usize = word
        .parse()
        .with_context(|| format!("'{word}' is not a tab number"))?;
    if n == 0 {
        bail!("tabs are numbered from 1");
    }
    Ok(n - 1)
}

/// Run a front-end command. Returns the text to print.
pub fn run(
    cmd: MetaCommand,
    terminal: &mut Option<TerminalSession>,
    dispatcher: &Dispatcher,
) -> Result<String> {
    let term = terminal
        .as_mut()
        .ok_or_else(|| anyhow!("no active session"))?;
    match cmd {
        MetaCommand::Help => Ok(HELP.to_string()),
        MetaCommand::Tabs => Ok(list_tabs(term)),
        MetaCommand::NewTab(name) => {
            term.open_tab(name.as_deref());
            Ok(format!("opened {}", term.active_tab().name))
        },
        MetaCommand::SwitchTab(index) => {
            let id = tab_id(term, index)?;
            term.switch_tab(&id)?;
            Ok(format!("switched to {}", term.active_tab().name))
        },
        MetaCommand::CloseTab(index) => {
            let id = tab_id(term, index)?;
            term.close_tab(&id)?;
            Ok(format!("closed tab {}", index + 1))
        },
        MetaCommand::RenameTab(name) => {
            let id = term.active_tab().id.clone();
            term.rename_tab(&id, &name)?;
            Ok(format!("renamed tab to {name}"))
        },
        MetaCommand::Export { format, path } => {
            let data = term.export(format)?;
            match path {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("writing {}", path.display()))?;
                    Ok(format!("exported session to {}", path.display()))
                },
                None => Ok(data),
            }
        },
        MetaCommand::Import(path) => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let session = Session::import(&data, ExportFormat::Json)?;
            let name = session.name.clone();
            let state = terminal
                .take()
                .ok_or_else(|| anyhow!("no active session"))?
                .into_state();
            *terminal = Some(TerminalSession::restore(session, state)?);
            Ok(format!("imported session {name}"))
        },
        MetaCommand::Complete(text) => {
            let items = dispatcher.suggest(&text, text.len(), term.state());
            if items.is_empty() {
                return Ok("(no suggestions)".to_string());
            }
            Ok(items
                .iter()
                .map(|i| match &i.description {
                    Some(d) => format!("{:<20} {:>5.1}  {d}", i.label, i.score),
                    None => format!("{:<20} {:>5.1}", i.label, i.score),
                })
                .collect::<Vec<_>>()
                .join("\n"))
        },
    }
}

fn tab_id(term: &TerminalSession, index: usize) -> Result<String> {
    term.tab_ids()
        .get(index)
        .map(|id| (*id).to_string())
        .ok_or_else(|| anyhow!("no tab {}", index + 1))
}

fn list_tabs(term: &TerminalSession) -> String {
    term.session()
        .tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let marker = if i == term.active_index() { '*' } else { ' ' };
            format!(
                "{marker} {}  {}  ({} lines, {} commands)",
                i + 1,
                tab.name,
                tab.output.len(),
                tab.history.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use devterm_terminal::ShellState;
    use devterm_types::config::EngineConfig;

    fn setup() -> (Dispatcher, Option<TerminalSession>) {
        (
            Dispatcher::new(&EngineConfig::default()).unwrap(),
            Some(TerminalSession::new("test", ShellState::in_memory().unwrap())),
        )
    }

    #[test]
    fn parse_tab_commands() {
        assert_eq!(MetaCommand::parse("").unwrap(), MetaCommand::Help);
        assert_eq!(MetaCommand::parse("tab new").unwrap(), MetaCommand::NewTab(None));
        assert_eq!(
            MetaCommand::parse("tab new build logs").unwrap(),
            MetaCommand::NewTab(Some("build logs".into()))
        );
        assert_eq!(MetaCommand::parse("tab 2").unwrap(), MetaCommand::SwitchTab(1));
        assert_eq!(MetaCommand::parse("tab close 1").unwrap(), MetaCommand::CloseTab(0));
        assert!(MetaCommand::parse("tab 0").is_err());
        assert!(MetaCommand::parse("tab x").is_err());
        assert!(MetaCommand::parse("tab rename").is_err());
    }

    #[test]
    fn parse_export_and_complete() {
        assert_eq!(
            MetaCommand::parse("export csv out.csv").unwrap(),
            MetaCommand::Export {
                format: ExportFormat::Csv,
                path: Some(PathBuf::from("out.csv")),
            }
        );
        assert!(MetaCommand::parse("export xml").is_err());
        assert!(MetaCommand::parse("import").is_err());
        assert_eq!(
            MetaCommand::parse("complete git st").unwrap(),
            MetaCommand::Complete("git st".into())
        );
        assert!(MetaCommand::parse("bogus").is_err());
    }

    #[test]
    fn tabs_open_switch_and_close() {
        let (d, mut term) = setup();
        run(MetaCommand::NewTab(Some("logs".into())), &mut term, &d).unwrap();
        let listing = run(MetaCommand::Tabs, &mut term, &d).unwrap();
        assert!(listing.contains("* 2  logs"));
        run(MetaCommand::SwitchTab(0), &mut term, &d).unwrap();
        run(MetaCommand::CloseTab(1), &mut term, &d).unwrap();
        assert!(run(MetaCommand::CloseTab(0), &mut term, &d).is_err());
        assert!(run(MetaCommand::SwitchTab(5), &mut term, &d).is_err());
    }

    #[tokio::test]
    async fn export_then_import_file() {
        let (d, mut term) = setup();
        if let Some(t) = term.as_mut() {
            t.submit(&d, "export EDITOR=nano").await;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        run(
            MetaCommand::Export {
                format: ExportFormat::Json,
                path: Some(path.clone()),
            },
            &mut term,
            &d,
        )
        .unwrap();

        let msg = run(MetaCommand::Import(path), &mut term, &d).unwrap();
        assert_eq!(msg, "imported session test");
        let t = term.as_ref().unwrap();
        assert_eq!(
            t.state().environment.get("EDITOR").map(String::as_str),
            Some("nano")
        );
        assert_eq!(t.state().history.len(), 1);
    }
}
