//! Assistant commands: ai, explain, enhance, highlight.
//!
//! `explain` and `highlight` run the syntax tokenizer over VFS files;
//! `enhance` goes through the session's [`CodeEnhancer`](crate::enhance::CodeEnhancer).

use std::collections::BTreeMap;
use std::time::Duration;

use devterm_syntax::{SyntaxToken, TokenType, token_summary};
use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;
use devterm_vfs::file_name;

use crate::interpreter::{Category, Command, CommandOutput, CommandRegistry, flag_value, positional};
use crate::repo::line_diff;
use crate::state::ShellState;

const ASSIST_LATENCY: Duration = Duration::from_millis(500);

/// Register the assistant commands.
pub fn register_ai_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(AiCmd));
    reg.register(Box::new(ExplainCmd));
    reg.register(Box::new(EnhanceCmd));
    reg.register(Box::new(HighlightCmd));
}

/// Read `input` and work out its language: `--lang` wins, then the file
/// extension, then content detection.
fn load_source(
    input: &str,
    lang_override: Option<&str>,
    state: &mut ShellState,
) -> Result<(String, String, &'static str)> {
    let (path, code) = state.read_file(input)?;
    let language = match lang_override {
        Some(l) => state
            .highlighter
            .languages()
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(l))
            .or_else(|| state.highlighter.language_for_file(&format!("x.{l}")))
            .ok_or_else(|| {
                DevtermError::Command(format!(
                    "unsupported language '{l}' (supported: {})",
                    state.highlighter.languages().join(", ")
                ))
            })?,
        None => state
            .highlighter
            .language_for_file(file_name(&path))
            .unwrap_or_else(|| state.highlighter.detect_language(&code)),
    };
    Ok((path, code, language))
}

// ---------------------------------------------------------------------------
// ai
// ---------------------------------------------------------------------------

/// Keyword groups and the canned answer they trigger, checked in order.
const TOPICS: &[(&[&str], &str)] = &[
    (
        &["commit", "git", "branch", "merge", "push"],
        "For version control try `git status` to see what changed, `git add .` and `git commit -m \"message\"` to record it, and `git checkout -b <name>` to start a branch.",
    ),
    (
        &["install", "dependency", "package", "npm", "yarn"],
        "Add a dependency with `npm install <pkg>` (`-D` for dev tools). `npm ls` shows what package.json declares.",
    ),
    (
        &["test", "spec", "jest", "vitest"],
        "Run `test` to execute the project's test script, or `vitest run <pattern>` to narrow it down. Test files end in `.test.js` or `.spec.js`.",
    ),
    (
        &["lint", "format", "style", "prettier", "eslint"],
        "`lint` reports problems in src/, `eslint --fix <file>` repairs the mechanical ones and `prettier --write <path>` normalizes formatting.",
    ),
    (
        &["server", "serve", "port", "dev", "localhost"],
        "Start the dev server with `dev` (port 5173), inspect it with `ps` or `netstat`, and stop it with `kill :5173`.",
    ),
    (
        &["build", "bundle", "compile", "deploy"],
        "`build` bundles src/ into dist/, then `preview` serves the result on port 4173.",
    ),
    (
        &["file", "directory", "folder", "find", "search"],
        "Navigate with `ls`, `cd` and `tree`; search with `find . -name '*.js'` or `grep -rn <pattern> src`.",
    ),
    (
        &["error", "bug", "broken", "fix", "debug"],
        "Start with `explain <file>` to get an overview, then `enhance <file>` for suggested fixes. `history search <term>` finds what you ran before.",
    ),
];

fn answer(prompt: &str) -> Option<&'static str> {
    let words: Vec<String> = prompt
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    TOPICS
        .iter()
        .find(|(keys, _)| words.iter().any(|w| keys.contains(&w.as_str())))
        .map(|(_, reply)| *reply)
}

struct AiCmd;
impl Command for AiCmd {
    fn name(&self) -> &str {
        "ai"
    }
    fn description(&self) -> &str {
        "Ask the built-in assistant"
    }
    fn usage(&self) -> &str {
        "ai <question...>"
    }
    fn category(&self) -> Category {
        Category::Ai
    }
    fn aliases(&self) -> &[&str] {
        &["ask"]
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        ASSIST_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let prompt = args.join(" ");
        let mut out = CommandOutput::lines();
        match answer(&prompt) {
            Some(reply) => out.push(OutputLevel::Info, reply),
            None => {
                out.push(
                    OutputLevel::Info,
                    "I can help with git, packages, builds, tests, linting, servers and files.",
                );
                out.push(
                    OutputLevel::Info,
                    "Try `ai how do I run the tests` or `help` for the full command list.",
                );
            },
        }
        if let Ok(root) = state.project_root() {
            out.push(OutputLevel::Info, format!("(context: project at {root})"));
        }
        Ok(out.build())
    }
}

// ---------------------------------------------------------------------------
// explain
// ---------------------------------------------------------------------------

/// Distinct token values of `kind`, most frequent first.
fn top_values(tokens: &[SyntaxToken], kind: TokenType, limit: usize) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in tokens.iter().filter(|t| t.kind == kind) {
        *counts.entry(t.value.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(v, _)| v.to_string())
        .collect()
}

struct ExplainCmd;
impl Command for ExplainCmd {
    fn name(&self) -> &str {
        "explain"
    }
    fn description(&self) -> &str {
        "Summarize the structure of a source file"
    }
    fn usage(&self) -> &str {
        "explain <file> [--lang language]"
    }
    fn category(&self) -> Category {
        Category::Ai
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        ASSIST_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let lang = flag_value(args, "--lang");
        let Some(&input) = positional(args).iter().find(|a| Some(**a) != lang) else {
            return Err(DevtermError::usage(self.usage()));
        };
        let (path, code, language) = load_source(input, lang, state)?;
        let tokens = state.highlighter.highlight(&code, language);
        let summary = token_summary(&tokens);

        let lines = code.lines().count();
        let comments = code
            .lines()
            .map(str::trim_start)
            .filter(|l| l.starts_with("//") || l.starts_with('#') || l.starts_with("/*"))
            .count();
        let mut out = CommandOutput::lines().info(format!(
            "{}: {language}, {lines} line{}, {} token{}",
            file_name(&path),
            if lines == 1 { "" } else { "s" },
            tokens.len(),
            if tokens.len() == 1 { "" } else { "s" }
        ));
        for kind in TokenType::PRIORITY {
            if let Some(n) = summary.get(&kind) {
                out.push(OutputLevel::Info, format!("  {:<10}{n}", kind.as_str()));
            }
        }
        let functions = top_values(&tokens, TokenType::Function, 8);
        if !functions.is_empty() {
            out.push(OutputLevel::Success, format!("Functions: {}", functions.join(", ")));
        }
        let classes = top_values(&tokens, TokenType::Class, 8);
        if !classes.is_empty() {
            out.push(OutputLevel::Success, format!("Types: {}", classes.join(", ")));
        }
        let keywords = top_values(&tokens, TokenType::Keyword, 5);
        if !keywords.is_empty() {
            out.push(OutputLevel::Info, format!("Most used keywords: {}", keywords.join(", ")));
        }
        if lines > 0 && comments == 0 && lines >= 20 {
            out.push(OutputLevel::Warning, "No comments found; consider documenting the public surface.");
        }
        Ok(out.build())
    }
}

// ---------------------------------------------------------------------------
// enhance
// ---------------------------------------------------------------------------

struct EnhanceCmd;
impl Command for EnhanceCmd {
    fn name(&self) -> &str {
        "enhance"
    }
    fn description(&self) -> &str {
        "Suggest improvements to a source file"
    }
    fn usage(&self) -> &str {
        "enhance <file> [--apply]"
    }
    fn category(&self) -> Category {
        Category::Ai
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        ASSIST_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let apply = args.contains(&"--apply");
        let Some(&input) = positional(args).first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        let (path, code, language) = load_source(input, None, state)?;
        let suggestion = state.enhancer.enhance(&code, language)?;
        let name = file_name(&path).to_string();
        if suggestion == code {
            return Ok(CommandOutput::text(format!("No suggestions for {name}.")));
        }

        let old: Vec<&str> = code.lines().collect();
        let new: Vec<&str> = suggestion.lines().collect();
        let changed: Vec<String> = line_diff(&old, &new)
            .into_iter()
            .filter(|l| !l.starts_with(' '))
            .collect();
        if apply {
            state.vfs.write(&path, &suggestion)?;
            log::debug!("enhance: applied {} suggestion to {path}", state.enhancer.name());
            let added = changed.iter().filter(|l| l.starts_with('+')).count();
            return Ok(CommandOutput::lines()
                .success(format!(
                    "Applied {} to {name} ({added} line{} changed).",
                    state.enhancer.name(),
                    if added == 1 { "" } else { "s" }
                ))
                .build());
        }

        let mut out = CommandOutput::lines().info(format!(
            "Suggestions for {name} ({}):",
            state.enhancer.name()
        ));
        for line in changed {
            let level = if line.starts_with('+') {
                OutputLevel::Success
            } else {
                OutputLevel::Error
            };
            out.push(level, line);
        }
        Ok(out
            .info(format!("Run `enhance {input} --apply` to write these changes."))
            .build())
    }
}

// ---------------------------------------------------------------------------
// highlight
// ---------------------------------------------------------------------------

struct HighlightCmd;
impl Command for HighlightCmd {
    fn name(&self) -> &str {
        "highlight"
    }
    fn description(&self) -> &str {
        "Tokenize a source file for syntax highlighting"
    }
    fn usage(&self) -> &str {
        "highlight <file> [--lang language] [--json]"
    }
    fn category(&self) -> Category {
        Category::Ai
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let lang = flag_value(args, "--lang");
        let Some(&input) = positional(args).iter().find(|a| Some(**a) != lang) else {
            return Err(DevtermError::usage(self.usage()));
        };
        let (_, code, language) = load_source(input, lang, state)?;
        let tokens = state.highlighter.highlight(&code, language);
        if args.contains(&"--json") {
            return Ok(CommandOutput::Text(serde_json::to_string_pretty(&tokens)?));
        }
        let rows = tokens
            .iter()
            .map(|t| {
                vec![
                    t.kind.as_str().to_string(),
                    t.value.replace('\n', "\\n"),
                    format!("{}..{}", t.start, t.end),
                    t.color.to_string(),
                ]
            })
            .collect();
        Ok(CommandOutput::Table {
            headers: ["Type", "Token", "Span", "Color"]
                .into_iter()
                .map(String::from)
                .collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::CodeEnhancer;

    fn setup() -> (CommandRegistry, ShellState) {
        (CommandRegistry::with_builtins(), ShellState::in_memory().unwrap())
    }

    fn exec(reg: &CommandRegistry, state: &mut ShellState, line: &str) -> Result<CommandOutput> {
        reg.execute(line, state)
    }

    fn text(out: CommandOutput) -> String {
        out.render()
    }

    #[test]
    fn ai_answers_by_topic() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "ai how do I commit my work").unwrap());
        assert!(out.contains("git commit -m"));
        assert!(out.ends_with("(context: project at /home/developer/project)"));
        let fallback = text(exec(&reg, &mut st, "ask what is the weather").unwrap());
        assert!(fallback.starts_with("I can help with"));
        assert!(matches!(exec(&reg, &mut st, "ai"), Err(DevtermError::Usage(_))));
    }

    #[test]
    fn explain_summarizes_tokens() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "explain src/utils.js").unwrap());
        assert!(out.starts_with("utils.js: javascript, 5 lines"));
        assert!(out.contains("Functions: greet"));
        assert!(out.contains("  keyword"));
    }

    #[test]
    fn explain_missing_file() {
        let (reg, mut st) = setup();
        assert!(exec(&reg, &mut st, "explain nope.js").is_err());
        assert!(matches!(exec(&reg, &mut st, "explain"), Err(DevtermError::Usage(_))));
    }

    #[test]
    fn unknown_extension_falls_back_to_detection() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "write notes.txt hello there").unwrap();
        let out = text(exec(&reg, &mut st, "explain notes.txt").unwrap());
        assert!(out.starts_with("notes.txt: javascript"), "{out}");
        assert!(exec(&reg, &mut st, "highlight notes.txt --lang py").is_ok());
        let err = exec(&reg, &mut st, "highlight notes.txt --lang cobol").unwrap_err();
        assert!(err.to_string().contains("unsupported language 'cobol'"));
    }

    #[test]
    fn enhance_previews_then_applies() {
        let (reg, mut st) = setup();
        let path = "/home/developer/project/src/old.js";
        st.vfs.write(path, "var x = 1;  \nif (x == 1) {}\n").unwrap();
        let preview = exec(&reg, &mut st, "enhance src/old.js").unwrap();
        let CommandOutput::Lines(lines) = &preview else {
            panic!("expected lines");
        };
        assert!(lines.iter().any(|(lvl, l)| *lvl == OutputLevel::Success && l == "+let x = 1;"));
        assert!(lines.iter().any(|(lvl, l)| *lvl == OutputLevel::Error && l == "-var x = 1;  "));
        assert_eq!(st.vfs.read_to_string(path).unwrap(), "var x = 1;  \nif (x == 1) {}\n");

        let applied = text(exec(&reg, &mut st, "enhance src/old.js --apply").unwrap());
        assert_eq!(applied, "Applied offline to old.js (2 lines changed).");
        assert_eq!(st.vfs.read_to_string(path).unwrap(), "let x = 1;\nif (x === 1) {}\n");
        assert_eq!(
            text(exec(&reg, &mut st, "enhance src/old.js").unwrap()),
            "No suggestions for old.js."
        );
    }

    struct Shouty;
    impl CodeEnhancer for Shouty {
        fn name(&self) -> &str {
            "shouty"
        }
        fn enhance(&self, code: &str, _language: &str) -> Result<String> {
            Ok(code.to_uppercase())
        }
    }

    #[test]
    fn enhance_uses_configured_enhancer() {
        let reg = CommandRegistry::with_builtins();
        let mut st = ShellState::in_memory().unwrap().with_enhancer(Box::new(Shouty));
        let out = text(exec(&reg, &mut st, "enhance src/utils.js").unwrap());
        assert!(out.starts_with("Suggestions for utils.js (shouty):"));
    }

    #[test]
    fn highlight_table_and_json() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "write snippet.js const x = 42;").unwrap();
        let table = text(exec(&reg, &mut st, "highlight snippet.js").unwrap());
        let rows: Vec<&str> = table.lines().collect();
        assert!(rows[0].starts_with("Type"));
        assert!(rows[1].starts_with("keyword"));
        assert_eq!(rows.len(), 5);
        let json = text(exec(&reg, &mut st, "highlight snippet.js --json").unwrap());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[3]["type"], "number");
        assert_eq!(value[3]["start"], 10);
    }
}
