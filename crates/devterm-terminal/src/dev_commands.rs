//! Build, server, test and lint commands.
//!
//! Everything here works off the VFS: builds emit artifacts into `dist/` or
//! `target/`, servers register in the process table, and test runners and
//! linters scan project sources.

use std::collections::BTreeSet;
use std::time::Duration;

use regex::Regex;

use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;
use devterm_vfs::{EntryKind, file_name};

use crate::enhance::{CodeEnhancer, OfflineEnhancer};
use crate::interpreter::{
    Category, Command, CommandOutput, CommandRegistry, flag_value, has_flag, positional,
};
use crate::package_commands::Manifest;
use crate::repo::Repository;
use crate::state::ShellState;

const BUILD_LATENCY: Duration = Duration::from_millis(1500);
const TEST_LATENCY: Duration = Duration::from_millis(800);
const LINT_LATENCY: Duration = Duration::from_millis(400);
const SERVER_LATENCY: Duration = Duration::from_millis(300);

/// Directories never scanned for sources.
const SKIP_DIRS: &[&str] = &["node_modules", "dist", "target", ".git"];

/// Register build, server, test and lint commands.
pub fn register_dev_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(BuildCmd));
    reg.register(Box::new(MakeCmd));
    reg.register(Box::new(CargoCmd));
    reg.register(Box::new(TscCmd));
    reg.register(Box::new(ServeCmd));
    reg.register(Box::new(DevServerCmd::DEV));
    reg.register(Box::new(DevServerCmd::PREVIEW));
    reg.register(Box::new(TestCmd));
    reg.register(Box::new(TestRunnerCmd::JEST));
    reg.register(Box::new(TestRunnerCmd::VITEST));
    reg.register(Box::new(LintCmd));
    reg.register(Box::new(EslintCmd));
    reg.register(Box::new(PrettierCmd));
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Directory containing `file`, searching from the cwd upwards.
fn find_upwards(state: &ShellState, file: &str) -> Option<String> {
    let mut dir = state.cwd.as_str();
    loop {
        if state.vfs.peek(&join(dir, file)).is_some_and(|e| e.is_file()) {
            return Some(dir.to_string());
        }
        if dir == "/" {
            return None;
        }
        dir = devterm_vfs::parent(dir);
    }
}

/// Files below `root` whose name ends with one of `exts`, skipping build
/// output and dependency directories.
fn source_files(state: &ShellState, root: &str, exts: &[&str]) -> Vec<String> {
    let prefix = if root == "/" { "/".to_string() } else { format!("{root}/") };
    state
        .vfs
        .paths_with_prefix(root)
        .into_iter()
        .filter(|p| {
            let rel = &p[prefix.len()..];
            !rel.split('/').any(|seg| SKIP_DIRS.contains(&seg))
        })
        .filter(|p| state.vfs.peek(p).is_some_and(|e| e.kind == EntryKind::File))
        .filter(|p| exts.iter().any(|ext| p.ends_with(ext)))
        .collect()
}

/// Root-relative display form.
fn display(root: &str, path: &str) -> String {
    path.strip_prefix(root)
        .map(|r| r.trim_start_matches('/').to_string())
        .unwrap_or_else(|| path.to_string())
}

fn read(state: &mut ShellState, path: &str) -> Result<String> {
    state.vfs.read_to_string(path)
}

/// Short content hash used for bundle names.
fn content_hash(text: &str) -> String {
    let mut h: u32 = 0x811c_9dc5;
    for b in text.bytes() {
        h ^= u32::from(b);
        h = h.wrapping_mul(0x0100_0193);
    }
    format!("{h:08x}")
}

fn format_kb(bytes: usize) -> String {
    format!("{:.2} kB", bytes as f64 / 1000.0)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn parse_port(args: &[&str], default: u16) -> Result<u16> {
    match flag_value(args, "-p").or_else(|| flag_value(args, "--port")) {
        Some(p) => match p.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(DevtermError::Command(format!("invalid port: {p}"))),
        },
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

struct BuildCmd;
impl Command for BuildCmd {
    fn name(&self) -> &str {
        "build"
    }
    fn description(&self) -> &str {
        "Bundle the project into dist/"
    }
    fn usage(&self) -> &str {
        "build [--minify]"
    }
    fn category(&self) -> Category {
        Category::Build
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        BUILD_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let manifest = Manifest::load(state)?;
        if manifest.script("build").is_none() {
            return Err(DevtermError::Command(
                "no \"build\" script in package.json".to_string(),
            ));
        }
        let root = manifest.root.clone();
        let src = join(&root, "src");
        let files = source_files(state, &src, &[".js", ".jsx", ".ts", ".tsx", ".css"]);
        if files.is_empty() {
            return Err(DevtermError::Command(format!(
                "no source files found in {}",
                display(&root, &src)
            )));
        }

        let minify = args.contains(&"--minify");
        let mut bundle = String::new();
        for path in &files {
            let code = read(state, path)?;
            bundle.push_str(&format!("// {}\n", display(&root, path)));
            if minify {
                for line in code.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    bundle.push_str(line);
                }
                bundle.push('\n');
            } else {
                bundle.push_str(&code);
            }
        }

        let dist = join(&root, "dist");
        let assets = join(&dist, "assets");
        state.vfs.mkdir_all(&assets)?;
        let js_name = format!("index-{}.js", content_hash(&bundle));
        state.vfs.write(&join(&assets, &js_name), &bundle)?;
        let html = format!(
            "<!doctype html>\n<html>\n  <head><title>{}</title></head>\n  <body>\n    <div id=\"root\"></div>\n    <script type=\"module\" src=\"/assets/{js_name}\"></script>\n  </body>\n</html>\n",
            manifest.name()
        );
        state.vfs.write(&join(&dist, "index.html"), &html)?;
        log::debug!("build: bundled {} files into {js_name}", files.len());

        Ok(CommandOutput::lines()
            .info("vite v5.2.0 building for production...")
            .info(format!("✓ {} transformed.", plural(files.len(), "module")))
            .info(format!("dist/index.html              {}", format_kb(html.len())))
            .info(format!("dist/assets/{js_name}  {}", format_kb(bundle.len())))
            .success("✓ built in 1.50s")
            .build())
    }
}

// ---------------------------------------------------------------------------
// make
// ---------------------------------------------------------------------------

/// A parsed Makefile rule.
#[derive(Debug, Clone, PartialEq)]
struct Rule {
    target: String,
    deps: Vec<String>,
    recipe: Vec<String>,
}

fn parse_makefile(text: &str) -> Vec<Rule> {
    let mut rules: Vec<Rule> = Vec::new();
    for line in text.lines() {
        if let Some(cmd) = line.strip_prefix('\t') {
            if let Some(rule) = rules.last_mut() {
                rule.recipe.push(cmd.to_string());
            }
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((target, deps)) = trimmed.split_once(':')
            && !target.contains('=')
            && !deps.starts_with('=')
        {
            rules.push(Rule {
                target: target.trim().to_string(),
                deps: deps.split_whitespace().map(String::from).collect(),
                recipe: Vec::new(),
            });
        }
    }
    rules
}

fn run_rule(
    rules: &[Rule],
    target: &str,
    done: &mut BTreeSet<String>,
    out: &mut Vec<String>,
) -> Result<()> {
    if done.contains(target) {
        return Ok(());
    }
    let Some(rule) = rules.iter().find(|r| r.target == target) else {
        return Err(DevtermError::Command(format!(
            "make: *** No rule to make target '{target}'.  Stop."
        )));
    };
    done.insert(target.to_string());
    for dep in &rule.deps {
        if rules.iter().any(|r| &r.target == dep) {
            run_rule(rules, dep, done, out)?;
        }
    }
    for cmd in &rule.recipe {
        match cmd.strip_prefix('@') {
            Some(silent) => {
                if let Some(msg) = silent.strip_prefix("echo ") {
                    out.push(msg.trim_matches(['"', '\'']).to_string());
                }
            },
            None => out.push(cmd.clone()),
        }
    }
    Ok(())
}

struct MakeCmd;
impl Command for MakeCmd {
    fn name(&self) -> &str {
        "make"
    }
    fn description(&self) -> &str {
        "Run Makefile targets"
    }
    fn usage(&self) -> &str {
        "make [target...]"
    }
    fn category(&self) -> Category {
        Category::Build
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        Duration::from_millis(500)
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let path = join(&state.cwd, "Makefile");
        if !state.vfs.exists(&path) {
            return Err(DevtermError::Command(
                "make: *** No targets specified and no makefile found.  Stop.".to_string(),
            ));
        }
        let text = read(state, &path)?;
        let rules = parse_makefile(&text);
        let targets: Vec<String> = match positional(args) {
            t if t.is_empty() => rules
                .iter()
                .find(|r| !r.target.starts_with('.'))
                .map(|r| vec![r.target.clone()])
                .ok_or_else(|| DevtermError::Command("make: *** No targets.  Stop.".to_string()))?,
            t => t.into_iter().map(String::from).collect(),
        };

        let mut done = BTreeSet::new();
        let mut out = Vec::new();
        for target in &targets {
            let before = out.len();
            run_rule(&rules, target, &mut done, &mut out)?;
            if out.len() == before {
                out.push(format!("make: Nothing to be done for '{target}'."));
            }
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cargo
// ---------------------------------------------------------------------------

struct CrateInfo {
    root: String,
    name: String,
    version: String,
}

fn load_crate(state: &mut ShellState) -> Result<CrateInfo> {
    let root = find_upwards(state, "Cargo.toml").ok_or_else(|| {
        DevtermError::Command(
            "error: could not find `Cargo.toml` in the current directory or any parent".to_string(),
        )
    })?;
    let text = read(state, &join(&root, "Cargo.toml"))?;
    let manifest: toml::Value = toml::from_str(&text)?;
    let package = manifest.get("package").ok_or_else(|| {
        DevtermError::Command("error: Cargo.toml is missing a [package] table".to_string())
    })?;
    let name = package
        .get("name")
        .and_then(toml::Value::as_str)
        .unwrap_or_else(|| file_name(&root))
        .to_string();
    let version = package
        .get("version")
        .and_then(toml::Value::as_str)
        .unwrap_or("0.0.0")
        .to_string();
    Ok(CrateInfo {
        root,
        name,
        version,
    })
}

/// Names of `#[test]` functions across the crate's sources.
fn rust_tests(state: &mut ShellState, root: &str) -> Result<Vec<String>> {
    let re = Regex::new(r"#\[test\]\s*(?:#\[[^\]]*\]\s*)*fn\s+(\w+)")?;
    let mut names = Vec::new();
    for path in source_files(state, root, &[".rs"]) {
        let code = read(state, &path)?;
        names.extend(re.captures_iter(&code).map(|c| c[1].to_string()));
    }
    Ok(names)
}

/// String literals passed to `println!` in `src/main.rs`, in order.
fn program_output(code: &str) -> Result<Vec<String>> {
    let re = Regex::new(r#"println!\(\s*"((?:[^"\\]|\\.)*)""#)?;
    Ok(re
        .captures_iter(code)
        .map(|c| c[1].replace("\\\"", "\"").replace("\\n", "\n"))
        .collect())
}

struct CargoCmd;

impl CargoCmd {
    fn compile(info: &CrateInfo, release: bool, verb: &str, state: &mut ShellState) -> Result<Vec<String>> {
        let profile = if release { "release" } else { "debug" };
        if verb == "Compiling" {
            let dir = join(&info.root, &format!("target/{profile}"));
            state.vfs.mkdir_all(&dir)?;
            state
                .vfs
                .write(&join(&dir, &info.name), &format!("ELF {} {}\n", info.name, info.version))?;
        }
        let finished = if release {
            "`release` profile [optimized]"
        } else {
            "`dev` profile [unoptimized + debuginfo]"
        };
        Ok(vec![
            format!("   {verb} {} v{} ({})", info.name, info.version, info.root),
            format!("    Finished {finished} target(s) in 0.84s"),
        ])
    }

    fn new_crate(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some(&name) = positional(args).first() else {
            return Err(DevtermError::usage("cargo new <name> [--lib]"));
        };
        let lib = args.contains(&"--lib");
        let root = state.resolve(name);
        if state.vfs.exists(&root) {
            return Err(DevtermError::Command(format!(
                "error: destination `{root}` already exists"
            )));
        }
        let crate_name = file_name(&root).to_string();
        state.vfs.mkdir_all(&join(&root, "src"))?;
        state.vfs.write(
            &join(&root, "Cargo.toml"),
            &format!(
                "[package]\nname = \"{crate_name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n"
            ),
        )?;
        if lib {
            state.vfs.write(
                &join(&root, "src/lib.rs"),
                "pub fn add(left: u64, right: u64) -> u64 {\n    left + right\n}\n\n#[cfg(test)]\nmod tests {\n    use super::*;\n\n    #[test]\n    fn it_works() {\n        assert_eq!(add(2, 2), 4);\n    }\n}\n",
            )?;
        } else {
            state.vfs.write(
                &join(&root, "src/main.rs"),
                "fn main() {\n    println!(\"Hello, world!\");\n}\n",
            )?;
        }
        state.vfs.write(&join(&root, ".gitignore"), "/target\n")?;
        if !state.repos.contains_key(&root) {
            let repo = Repository::init(&root, &mut state.vfs)?;
            state.repos.insert(root.clone(), repo);
        }
        Ok(CommandOutput::text(format!(
            "    Creating {} `{crate_name}` package",
            if lib { "library" } else { "binary (application)" }
        )))
    }
}

impl Command for CargoCmd {
    fn name(&self) -> &str {
        "cargo"
    }
    fn description(&self) -> &str {
        "Rust package manager and build tool"
    }
    fn usage(&self) -> &str {
        "cargo <new|build|run|test|check|--version> [--release]"
    }
    fn category(&self) -> Category {
        Category::Build
    }
    fn latency(&self, args: &[&str]) -> Duration {
        match args.first() {
            Some(&("build" | "run" | "b" | "r")) => BUILD_LATENCY,
            Some(&("test" | "t" | "check" | "c")) => TEST_LATENCY,
            _ => Duration::ZERO,
        }
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((&sub, rest)) = args.split_first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        let release = rest.contains(&"--release") || rest.contains(&"-r");
        match sub {
            "--version" | "-V" | "version" => Ok(CommandOutput::text("cargo 1.78.0")),
            "new" | "init" => Self::new_crate(rest, state),
            "build" | "b" => {
                let info = load_crate(state)?;
                let lines = Self::compile(&info, release, "Compiling", state)?;
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            "check" | "c" => {
                let info = load_crate(state)?;
                let lines = Self::compile(&info, false, "Checking", state)?;
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            "run" | "r" => {
                let info = load_crate(state)?;
                let main = join(&info.root, "src/main.rs");
                if !state.vfs.exists(&main) {
                    return Err(DevtermError::Command(
                        "error: a bin target must be available for `cargo run`".to_string(),
                    ));
                }
                let mut lines = Self::compile(&info, release, "Compiling", state)?;
                let profile = if release { "release" } else { "debug" };
                lines.push(format!("     Running `target/{profile}/{}`", info.name));
                let code = read(state, &main)?;
                lines.extend(program_output(&code)?);
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            "test" | "t" => {
                let info = load_crate(state)?;
                let mut lines = Self::compile(&info, false, "Compiling", state)?;
                let tests = rust_tests(state, &info.root)?;
                lines.push(String::new());
                lines.push(format!("running {}", plural(tests.len(), "test")));
                for name in &tests {
                    lines.push(format!("test tests::{name} ... ok"));
                }
                lines.push(String::new());
                lines.push(format!(
                    "test result: ok. {} passed; 0 failed; 0 ignored; 0 measured; 0 filtered out",
                    tests.len()
                ));
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            other => Err(DevtermError::Command(format!(
                "error: no such command: `{other}`"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// tsc
// ---------------------------------------------------------------------------

/// First bracket mismatch in `code` as `(line, col, message)`, skipping
/// string literals and comments.
fn bracket_error(code: &str) -> Option<(usize, usize, String)> {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    for (ln, line) in code.lines().enumerate() {
        let mut quote: Option<char> = None;
        let mut prev = '\0';
        for (col, c) in line.chars().enumerate() {
            if let Some(q) = quote {
                if c == q && prev != '\\' {
                    quote = None;
                }
                prev = c;
                continue;
            }
            match c {
                '/' if prev == '/' => break,
                '"' | '\'' | '`' => quote = Some(c),
                '(' | '[' | '{' => stack.push((c, ln + 1, col + 1)),
                ')' | ']' | '}' => {
                    let want = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _, _)) if open == want => {},
                        _ => return Some((ln + 1, col + 1, "Declaration or statement expected.".to_string())),
                    }
                },
                _ => {},
            }
            prev = c;
        }
    }
    stack.pop().map(|(open, ln, col)| {
        let close = match open {
            '(' => ')',
            '[' => ']',
            _ => '}',
        };
        (ln, col, format!("'{close}' expected."))
    })
}

struct TscCmd;
impl Command for TscCmd {
    fn name(&self) -> &str {
        "tsc"
    }
    fn description(&self) -> &str {
        "Type-check TypeScript sources"
    }
    fn usage(&self) -> &str {
        "tsc [--noEmit] [file...]"
    }
    fn category(&self) -> Category {
        Category::Build
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        Duration::from_millis(600)
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let explicit: Vec<String> = positional(args).iter().map(|p| state.resolve(p)).collect();
        let root = find_upwards(state, "package.json").unwrap_or_else(|| state.cwd.clone());
        let files = if explicit.is_empty() {
            source_files(state, &root, &[".ts", ".tsx"])
        } else {
            explicit
        };
        if files.is_empty() {
            return Err(DevtermError::Command(
                "error TS18003: No inputs were found in config file.".to_string(),
            ));
        }

        let mut errors = Vec::new();
        let mut clean = Vec::new();
        for path in &files {
            let code = read(state, path)?;
            match bracket_error(&code) {
                Some((ln, col, msg)) => errors.push(format!(
                    "{}({ln},{col}): error TS1005: {msg}",
                    display(&root, path)
                )),
                None => clean.push(path.clone()),
            }
        }
        if !errors.is_empty() {
            errors.push(String::new());
            errors.push(format!(
                "Found {} in {}.",
                plural(errors.len() - 1, "error"),
                plural(errors.len() - 1, "file")
            ));
            return Err(DevtermError::Command(errors.join("\n")));
        }

        if !args.contains(&"--noEmit") {
            for path in &clean {
                let code = read(state, path)?;
                let out = match path.strip_suffix(".tsx") {
                    Some(stem) => format!("{stem}.jsx"),
                    None => format!("{}.js", path.trim_end_matches(".ts")),
                };
                let rel = display(&root, &out);
                let target = join(&join(&root, "dist"), rel.trim_start_matches("src/"));
                state.vfs.mkdir_all(devterm_vfs::parent(&target))?;
                state.vfs.write(&target, &code)?;
            }
        }
        Ok(CommandOutput::lines()
            .success(format!("Found 0 errors. Checked {}.", plural(files.len(), "file")))
            .build())
    }
}

// ---------------------------------------------------------------------------
// serve / dev / preview
// ---------------------------------------------------------------------------

fn server_banner(pid: u32, url: &str) -> Vec<(OutputLevel, String)> {
    vec![
        (OutputLevel::Success, format!("  ➜  Local:   {url}")),
        (OutputLevel::Info, "  ➜  Network: use --host to expose".to_string()),
        (OutputLevel::Info, format!("[{pid}] running in background")),
    ]
}

struct ServeCmd;
impl Command for ServeCmd {
    fn name(&self) -> &str {
        "serve"
    }
    fn description(&self) -> &str {
        "Serve a directory over HTTP"
    }
    fn usage(&self) -> &str {
        "serve [dir] [-p port]"
    }
    fn category(&self) -> Category {
        Category::Server
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        SERVER_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let port = parse_port(args, 3000)?;
        let dir_arg = args
            .iter()
            .enumerate()
            .find(|(i, a)| {
                !a.starts_with('-') && (*i == 0 || !matches!(args[i - 1], "-p" | "--port"))
            })
            .map_or(".", |(_, a)| *a);
        let dir = state.resolve(dir_arg);
        if !state.vfs.peek(&dir).is_some_and(|e| e.is_dir()) {
            return Err(DevtermError::Vfs(format!("no such directory: {dir}")));
        }
        if let Some(p) = state.processes.find_by_port(port) {
            return Err(DevtermError::Command(format!(
                "Error: listen EADDRINUSE: address already in use :::{port} (pid {})",
                p.pid
            )));
        }
        let pid = state
            .processes
            .spawn("serve", &format!("serve {dir} -p {port}"), Some(port));
        let mut out = CommandOutput::lines().success(format!("Serving {dir}"));
        for (level, line) in server_banner(pid, &format!("http://localhost:{port}/")) {
            out.push(level, line);
        }
        Ok(out.build())
    }
}

struct DevServerCmd {
    name: &'static str,
    description: &'static str,
    default_port: u16,
}

impl DevServerCmd {
    const DEV: Self = Self {
        name: "dev",
        description: "Start the development server",
        default_port: 5173,
    };
    const PREVIEW: Self = Self {
        name: "preview",
        description: "Preview the production build",
        default_port: 4173,
    };
}

impl Command for DevServerCmd {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        self.description
    }
    fn usage(&self) -> &str {
        if self.name == "dev" {
            "dev [-p port]"
        } else {
            "preview [-p port]"
        }
    }
    fn category(&self) -> Category {
        Category::Server
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        SERVER_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let manifest = Manifest::load(state)?;
        if self.name == "dev" && manifest.script("dev").is_none() {
            return Err(DevtermError::Command(
                "missing script: \"dev\" in package.json".to_string(),
            ));
        }
        if self.name == "preview" && !state.vfs.exists(&join(&manifest.root, "dist/index.html")) {
            return Err(DevtermError::Command(
                "dist/ not found. Run `build` first.".to_string(),
            ));
        }

        let mut out = CommandOutput::lines();
        let mut port = parse_port(args, self.default_port)?;
        while state.processes.find_by_port(port).is_some() {
            out.push(
                OutputLevel::Warning,
                format!("Port {port} is in use, trying another one..."),
            );
            port = port
                .checked_add(1)
                .ok_or_else(|| DevtermError::Command("no free port available".to_string()))?;
        }
        let command = if self.name == "dev" {
            format!("vite --port {port}")
        } else {
            format!("vite preview --port {port}")
        };
        let pid = state.processes.spawn("node", &command, Some(port));
        out.push(OutputLevel::Info, "  VITE v5.2.0  ready in 312 ms");
        for (level, line) in server_banner(pid, &format!("http://localhost:{port}/")) {
            out.push(level, line);
        }
        Ok(out.build())
    }
}

// ---------------------------------------------------------------------------
// test / jest / vitest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Runner {
    Jest,
    Vitest,
}

/// `(path, test names)` for every test file under the project.
fn discover_tests(
    state: &mut ShellState,
    root: &str,
    filter: Option<&str>,
) -> Result<Vec<(String, Vec<String>)>> {
    let re = Regex::new(r#"\b(?:it|test)\(\s*['"`]([^'"`]*)['"`]"#)?;
    let files: Vec<String> = source_files(state, root, &[".js", ".jsx", ".ts", ".tsx"])
        .into_iter()
        .filter(|p| {
            let name = file_name(p);
            name.contains(".test.") || name.contains(".spec.")
        })
        .filter(|p| filter.is_none_or(|f| p.contains(f)))
        .collect();
    let mut suites = Vec::new();
    for path in files {
        let code = read(state, &path)?;
        let names = re.captures_iter(&code).map(|c| c[1].to_string()).collect();
        suites.push((path, names));
    }
    Ok(suites)
}

fn run_tests(runner: Runner, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let root = state.project_root()?;
    let filter = positional(args).first().copied();
    let suites = discover_tests(state, &root, filter)?;
    if suites.is_empty() {
        return Err(DevtermError::Command(match runner {
            Runner::Jest => "No tests found, exiting with code 1".to_string(),
            Runner::Vitest => "No test files found, exiting with code 1".to_string(),
        }));
    }
    let total: usize = suites.iter().map(|(_, t)| t.len()).sum();
    let verbose = has_flag(args, 'v', "verbose");
    let mut out = CommandOutput::lines();
    match runner {
        Runner::Jest => {
            for (path, names) in &suites {
                out.push(OutputLevel::Success, format!("PASS {}", display(&root, path)));
                if verbose {
                    for name in names {
                        out.push(OutputLevel::Info, format!("  ✓ {name}"));
                    }
                }
            }
            out.push(OutputLevel::Info, "");
            out.push(
                OutputLevel::Success,
                format!("Test Suites: {} passed, {} total", suites.len(), suites.len()),
            );
            out.push(OutputLevel::Success, format!("Tests:       {total} passed, {total} total"));
        },
        Runner::Vitest => {
            out.push(OutputLevel::Info, format!(" RUN  v1.5.0 {root}"));
            out.push(OutputLevel::Info, "");
            for (path, names) in &suites {
                out.push(
                    OutputLevel::Success,
                    format!(" ✓ {} ({})", display(&root, path), plural(names.len(), "test")),
                );
                if verbose {
                    for name in names {
                        out.push(OutputLevel::Info, format!("   ✓ {name}"));
                    }
                }
            }
            out.push(OutputLevel::Info, "");
            out.push(
                OutputLevel::Success,
                format!(" Test Files  {} passed ({})", suites.len(), suites.len()),
            );
            out.push(OutputLevel::Success, format!("      Tests  {total} passed ({total})"));
        },
    }
    Ok(out.build())
}

struct TestCmd;
impl Command for TestCmd {
    fn name(&self) -> &str {
        "test"
    }
    fn description(&self) -> &str {
        "Run the project's test script"
    }
    fn usage(&self) -> &str {
        "test [pattern] [-v]"
    }
    fn category(&self) -> Category {
        Category::Test
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        TEST_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let manifest = Manifest::load(state)?;
        let script = manifest.script("test").ok_or_else(|| {
            DevtermError::Command("missing script: \"test\" in package.json".to_string())
        })?;
        let runner = if script.contains("jest") {
            Runner::Jest
        } else {
            Runner::Vitest
        };
        run_tests(runner, args, state)
    }
}

struct TestRunnerCmd {
    runner: Runner,
}

impl TestRunnerCmd {
    const JEST: Self = Self {
        runner: Runner::Jest,
    };
    const VITEST: Self = Self {
        runner: Runner::Vitest,
    };
}

impl Command for TestRunnerCmd {
    fn name(&self) -> &str {
        match self.runner {
            Runner::Jest => "jest",
            Runner::Vitest => "vitest",
        }
    }
    fn description(&self) -> &str {
        match self.runner {
            Runner::Jest => "Run tests with Jest",
            Runner::Vitest => "Run tests with Vitest",
        }
    }
    fn usage(&self) -> &str {
        match self.runner {
            Runner::Jest => "jest [pattern] [--verbose]",
            Runner::Vitest => "vitest [run] [pattern] [--verbose]",
        }
    }
    fn category(&self) -> Category {
        Category::Test
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        TEST_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let args = match (self.runner, args.first()) {
            (Runner::Vitest, Some(&"run")) => &args[1..],
            _ => args,
        };
        run_tests(self.runner, args, state)
    }
}

// ---------------------------------------------------------------------------
// lint / eslint / prettier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Problem {
    line: usize,
    col: usize,
    error: bool,
    message: &'static str,
    rule: &'static str,
}

/// Column of the first `==`/`!=` that is not part of a strict comparison.
fn loose_equality(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
        } else if matches!(c, b'\'' | b'"' | b'`') {
            quote = Some(c);
        } else if c == b'/' && bytes[i + 1] == b'/' {
            return None;
        } else if (c == b'=' || c == b'!')
            && bytes[i + 1] == b'='
            && bytes.get(i + 2) != Some(&b'=')
            && (c == b'!' || i == 0 || !matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>'))
        {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn lint_source(code: &str, typescript: bool) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (n, line) in code.lines().enumerate() {
        let trimmed = line.trim_start();
        let col = line.len() - trimmed.len() + 1;
        if trimmed.starts_with("//") {
            continue;
        }
        if trimmed.starts_with("var ") {
            problems.push(Problem {
                line: n + 1,
                col,
                error: true,
                message: "Unexpected var, use let or const instead",
                rule: "no-var",
            });
        }
        if let Some(c) = loose_equality(line) {
            problems.push(Problem {
                line: n + 1,
                col: c,
                error: true,
                message: "Expected '===' and instead saw '=='",
                rule: "eqeqeq",
            });
        }
        if trimmed.starts_with("debugger") {
            problems.push(Problem {
                line: n + 1,
                col,
                error: true,
                message: "Unexpected 'debugger' statement",
                rule: "no-debugger",
            });
        }
        if let Some(c) = line.find("console.") {
            problems.push(Problem {
                line: n + 1,
                col: c + 1,
                error: false,
                message: "Unexpected console statement",
                rule: "no-console",
            });
        }
        if typescript && let Some(c) = line.find(": any") {
            problems.push(Problem {
                line: n + 1,
                col: c + 3,
                error: false,
                message: "Unexpected any. Specify a different type",
                rule: "@typescript-eslint/no-explicit-any",
            });
        }
    }
    problems
}

const LINT_EXTS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"];

/// ESLint over `targets` (files or directories). With `fix`, rewrites files
/// through the offline enhancer before reporting what remains.
fn eslint(targets: &[String], fix: bool, state: &mut ShellState) -> Result<CommandOutput> {
    let mut files = Vec::new();
    for target in targets {
        match state.vfs.peek(target) {
            Some(e) if e.is_dir() => files.extend(source_files(state, target, LINT_EXTS)),
            Some(_) => files.push(target.clone()),
            None => {
                return Err(DevtermError::Vfs(format!(
                    "No files matching the pattern \"{target}\" were found."
                )));
            },
        }
    }

    let (mut errors, mut warnings, mut fixed) = (0, 0, 0);
    let mut report = CommandOutput::lines();
    for path in &files {
        let mut code = read(state, path)?;
        let ts = path.ends_with(".ts") || path.ends_with(".tsx");
        if fix {
            let language = if ts { "typescript" } else { "javascript" };
            let fixed_code = OfflineEnhancer.enhance(&code, language)?;
            if fixed_code != code {
                state.vfs.write(path, &fixed_code)?;
                fixed += 1;
                code = fixed_code;
            }
        }
        let problems = lint_source(&code, ts);
        if problems.is_empty() {
            continue;
        }
        report.push(OutputLevel::Info, path.clone());
        for p in problems {
            let (level, label) = if p.error {
                errors += 1;
                (OutputLevel::Error, "error")
            } else {
                warnings += 1;
                (OutputLevel::Warning, "warning")
            };
            report.push(
                level,
                format!("  {}:{}  {label}  {}  {}", p.line, p.col, p.message, p.rule),
            );
        }
        report.push(OutputLevel::Info, "");
    }
    if fixed > 0 {
        log::debug!("eslint --fix rewrote {fixed} files");
    }

    let total = errors + warnings;
    if total == 0 {
        return Ok(CommandOutput::lines()
            .success(format!("✔ No problems found ({} checked)", plural(files.len(), "file")))
            .build());
    }
    let summary = format!(
        "✖ {} ({}, {})",
        plural(total, "problem"),
        plural(errors, "error"),
        plural(warnings, "warning")
    );
    if errors > 0 {
        let mut text: Vec<String> = match report.build() {
            CommandOutput::Lines(lines) => lines.into_iter().map(|(_, l)| l).collect(),
            _ => Vec::new(),
        };
        text.push(summary);
        return Err(DevtermError::Command(text.join("\n")));
    }
    Ok(report.warning(summary).build())
}

struct LintCmd;
impl Command for LintCmd {
    fn name(&self) -> &str {
        "lint"
    }
    fn description(&self) -> &str {
        "Lint the project's sources"
    }
    fn usage(&self) -> &str {
        "lint [--fix]"
    }
    fn category(&self) -> Category {
        Category::Lint
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        LINT_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let root = state.project_root()?;
        let src = join(&root, "src");
        let target = if state.vfs.exists(&src) { src } else { root };
        eslint(&[target], args.contains(&"--fix"), state)
    }
}

struct EslintCmd;
impl Command for EslintCmd {
    fn name(&self) -> &str {
        "eslint"
    }
    fn description(&self) -> &str {
        "Find problems in JavaScript/TypeScript files"
    }
    fn usage(&self) -> &str {
        "eslint [--fix] <path...>"
    }
    fn category(&self) -> Category {
        Category::Lint
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        LINT_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let targets: Vec<String> = positional(args).iter().map(|p| state.resolve(p)).collect();
        if targets.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        eslint(&targets, args.contains(&"--fix"), state)
    }
}

/// Prettier's formatting: two-space indentation, no trailing whitespace and
/// exactly one final newline.
fn prettier_format(code: &str) -> String {
    let mut out: String = code
        .lines()
        .map(|l| l.trim_end().replace('\t', "  "))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

struct PrettierCmd;
impl Command for PrettierCmd {
    fn name(&self) -> &str {
        "prettier"
    }
    fn description(&self) -> &str {
        "Check or apply code formatting"
    }
    fn usage(&self) -> &str {
        "prettier [--check|--write] <path...>"
    }
    fn category(&self) -> Category {
        Category::Lint
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        LINT_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let write = args.contains(&"--write") || args.contains(&"-w");
        let check = args.contains(&"--check") || args.contains(&"-c");
        let targets: Vec<String> = positional(args).iter().map(|p| state.resolve(p)).collect();
        if targets.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let root = find_upwards(state, "package.json").unwrap_or_else(|| state.cwd.clone());

        let mut files = Vec::new();
        for target in &targets {
            match state.vfs.peek(target) {
                Some(e) if e.is_dir() => files.extend(source_files(
                    state,
                    target,
                    &[".js", ".jsx", ".ts", ".tsx", ".json", ".css", ".md"],
                )),
                Some(_) => files.push(target.clone()),
                None => {
                    return Err(DevtermError::Vfs(format!("No files matching the pattern were found: \"{target}\"")));
                },
            }
        }

        if !write && !check {
            let mut outputs = Vec::new();
            for path in &files {
                outputs.push(prettier_format(&read(state, path)?));
            }
            return Ok(CommandOutput::Text(outputs.concat().trim_end().to_string()));
        }

        let mut out = CommandOutput::lines();
        let mut unformatted = 0;
        for path in &files {
            let code = read(state, path)?;
            let formatted = prettier_format(&code);
            let rel = display(&root, path);
            if formatted == code {
                if write {
                    out.push(OutputLevel::Info, format!("{rel} (unchanged)"));
                }
                continue;
            }
            unformatted += 1;
            if write {
                state.vfs.write(path, &formatted)?;
                out.push(OutputLevel::Success, rel);
            } else {
                out.push(OutputLevel::Warning, format!("[warn] {rel}"));
            }
        }
        if check {
            if unformatted > 0 {
                return Err(DevtermError::Command(format!(
                    "[warn] Code style issues found in {}. Run Prettier with --write to fix.",
                    plural(unformatted, "file")
                )));
            }
            out.push(OutputLevel::Success, "All matched files use Prettier code style!");
        }
        Ok(out.build())
    }
}
