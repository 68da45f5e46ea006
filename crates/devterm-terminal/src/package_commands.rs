//! Package manager commands: npm, yarn, pnpm, pip.
//!
//! Node package managers edit the `package.json` of the nearest project and
//! create stub directories under `node_modules/`. `pip` records installs as
//! `.dist-info` directories under a simulated site-packages.

use std::time::Duration;

use serde_json::{Map, Value};

use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;

use crate::interpreter::{Category, Command, CommandOutput, CommandRegistry, has_flag, positional};
use crate::state::ShellState;

const INSTALL_LATENCY: Duration = Duration::from_millis(1200);
const SCRIPT_LATENCY: Duration = Duration::from_millis(300);
const SITE_PACKAGES: &str = "/usr/lib/python3/site-packages";

/// Register the package manager commands.
pub fn register_package_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(NodePackageCmd::NPM));
    reg.register(Box::new(NodePackageCmd::YARN));
    reg.register(Box::new(NodePackageCmd::PNPM));
    reg.register(Box::new(PipCmd));
}

/// Versions handed out for well-known packages; anything else gets `^1.0.0`.
const KNOWN_VERSIONS: &[(&str, &str)] = &[
    ("react", "^18.2.0"),
    ("react-dom", "^18.2.0"),
    ("express", "^4.19.2"),
    ("lodash", "^4.17.21"),
    ("axios", "^1.6.8"),
    ("typescript", "^5.4.0"),
    ("vite", "^5.2.0"),
    ("vitest", "^1.5.0"),
    ("jest", "^29.7.0"),
    ("eslint", "^8.57.0"),
    ("prettier", "^3.2.5"),
    ("zod", "^3.23.0"),
    ("next", "^14.2.0"),
    ("vue", "^3.4.21"),
];

fn default_version(name: &str) -> &'static str {
    KNOWN_VERSIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map_or("^1.0.0", |(_, v)| v)
}

/// Split `name@version` (scoped names keep their leading `@`).
fn split_spec(spec: &str) -> (&str, Option<&str>) {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(i) => {
            let at = search_from + i;
            (&spec[..at], Some(&spec[at + 1..]))
        },
        None => (spec, None),
    }
}

// ---------------------------------------------------------------------------
// package.json
// ---------------------------------------------------------------------------

/// The parsed `package.json` of the project containing the cwd.
pub(crate) struct Manifest {
    pub root: String,
    pub json: Value,
}

impl Manifest {
    pub fn load(state: &mut ShellState) -> Result<Self> {
        let root = state.project_root()?;
        let text = state.vfs.read_to_string(&Self::path_in(&root))?;
        let json: Value = serde_json::from_str(&text)?;
        if !json.is_object() {
            return Err(DevtermError::Command(
                "package.json: top level must be an object".to_string(),
            ));
        }
        Ok(Self { root, json })
    }

    fn path_in(root: &str) -> String {
        if root == "/" {
            "/package.json".to_string()
        } else {
            format!("{root}/package.json")
        }
    }

    pub fn save(&self, state: &mut ShellState) -> Result<()> {
        let mut text = serde_json::to_string_pretty(&self.json)?;
        text.push('\n');
        state.vfs.write(&Self::path_in(&self.root), &text)
    }

    pub fn name(&self) -> &str {
        self.json["name"].as_str().unwrap_or("project")
    }

    pub fn version(&self) -> &str {
        self.json["version"].as_str().unwrap_or("0.0.0")
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.json["scripts"][name].as_str()
    }

    pub fn script_names(&self) -> Vec<&str> {
        self.json["scripts"]
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn section(&self, key: &str) -> Vec<(&str, &str)> {
        self.json[key]
            .as_object()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.as_str(), v.as_str().unwrap_or("*")))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn section_mut(&mut self, key: &str) -> Result<&mut Map<String, Value>> {
        let obj = self
            .json
            .as_object_mut()
            .ok_or_else(|| DevtermError::Command("package.json is not an object".to_string()))?;
        obj.entry(key)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| DevtermError::Command(format!("package.json: '{key}' is not an object")))
    }

    fn add_dependency(&mut self, name: &str, version: &str, dev: bool) -> Result<()> {
        let (target, other) = if dev {
            ("devDependencies", "dependencies")
        } else {
            ("dependencies", "devDependencies")
        };
        if let Some(map) = self.json.get_mut(other).and_then(Value::as_object_mut) {
            map.remove(name);
        }
        self.section_mut(target)?
            .insert(name.to_string(), Value::String(version.to_string()));
        Ok(())
    }

    fn remove_dependency(&mut self, name: &str) -> bool {
        let mut removed = false;
        for key in ["dependencies", "devDependencies"] {
            if let Some(map) = self.json.get_mut(key).and_then(Value::as_object_mut) {
                removed |= map.remove(name).is_some();
            }
        }
        removed
    }

    fn node_modules(&self) -> String {
        format!("{}/node_modules", self.root.trim_end_matches('/'))
    }
}

/// Materialize `node_modules/<name>/package.json`.
fn install_stub(state: &mut ShellState, modules: &str, name: &str, version: &str) -> Result<()> {
    let dir = format!("{modules}/{name}");
    state.vfs.mkdir_all(&dir)?;
    let body = serde_json::json!({
        "name": name,
        "version": version.trim_start_matches(['^', '~']),
    });
    state
        .vfs
        .write(&format!("{dir}/package.json"), &format!("{body}\n"))
}

// ---------------------------------------------------------------------------
// npm / yarn / pnpm
// ---------------------------------------------------------------------------

struct NodePackageCmd {
    tool: &'static str,
    description: &'static str,
    usage: &'static str,
    version: &'static str,
}

impl NodePackageCmd {
    const NPM: Self = Self {
        tool: "npm",
        description: "Node package manager",
        usage: "npm <install|uninstall|run|list|init|test|start|--version> [args]",
        version: "10.5.0",
    };
    const YARN: Self = Self {
        tool: "yarn",
        description: "Yarn package manager",
        usage: "yarn [install|add|remove|run|list|init|<script>] [args]",
        version: "1.22.22",
    };
    const PNPM: Self = Self {
        tool: "pnpm",
        description: "Fast, disk space efficient package manager",
        usage: "pnpm <install|add|remove|run|list|init|<script>> [args]",
        version: "9.0.6",
    };

    fn install(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let dev = has_flag(args, 'D', "save-dev") || args.contains(&"--dev");
        let specs = positional(args);
        let mut manifest = Manifest::load(state)?;
        let modules = manifest.node_modules();

        if specs.is_empty() {
            let mut deps = manifest.section("dependencies");
            deps.extend(manifest.section("devDependencies"));
            let deps: Vec<(String, String)> = deps
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect();
            for (name, version) in &deps {
                install_stub(state, &modules, name, version)?;
            }
            log::debug!("{} install: {} packages", self.tool, deps.len());
            return Ok(CommandOutput::lines()
                .success(format!("added {} packages in 1s", deps.len()))
                .build());
        }

        let mut out = CommandOutput::lines();
        for spec in &specs {
            let (name, requested) = split_spec(spec);
            if name.is_empty() {
                return Err(DevtermError::Command(format!("invalid package spec '{spec}'")));
            }
            let version = match requested {
                Some(v) if v.starts_with(|c: char| c.is_ascii_digit()) => format!("^{v}"),
                Some(v) => v.to_string(),
                None => default_version(name).to_string(),
            };
            manifest.add_dependency(name, &version, dev)?;
            install_stub(state, &modules, name, &version)?;
            out.push(
                OutputLevel::Info,
                format!("+ {name}@{}", version.trim_start_matches(['^', '~'])),
            );
        }
        manifest.save(state)?;
        let n = specs.len();
        Ok(out
            .success(format!(
                "added {n} package{} in 1s",
                if n == 1 { "" } else { "s" }
            ))
            .build())
    }

    fn uninstall(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let names = positional(args);
        if names.is_empty() {
            return Err(DevtermError::usage(&format!("{} uninstall <pkg...>", self.tool)));
        }
        let mut manifest = Manifest::load(state)?;
        let modules = manifest.node_modules();
        let mut removed = 0;
        for name in names {
            let (name, _) = split_spec(name);
            if manifest.remove_dependency(name) {
                removed += 1;
            }
            let dir = format!("{modules}/{name}");
            for path in state.vfs.paths_with_prefix(&dir).into_iter().rev() {
                state.vfs.delete(&path);
            }
            state.vfs.delete(&dir);
        }
        manifest.save(state)?;
        Ok(CommandOutput::lines()
            .success(format!(
                "removed {removed} package{} in 1s",
                if removed == 1 { "" } else { "s" }
            ))
            .build())
    }

    fn run_script(&self, name: &str, state: &mut ShellState) -> Result<CommandOutput> {
        let manifest = Manifest::load(state)?;
        let Some(script) = manifest.script(name) else {
            let available = manifest.script_names().join(", ");
            return Err(DevtermError::Command(format!(
                "{}: missing script: \"{name}\" (available: {available})",
                self.tool
            )));
        };
        Ok(CommandOutput::lines()
            .info(format!("> {}@{} {name}", manifest.name(), manifest.version()))
            .info(format!("> {script}"))
            .success(format!("script \"{name}\" finished"))
            .build())
    }

    fn list(&self, state: &mut ShellState) -> Result<CommandOutput> {
        let manifest = Manifest::load(state)?;
        let mut deps = manifest.section("dependencies");
        deps.extend(manifest.section("devDependencies"));
        deps.sort();
        let mut lines = vec![format!(
            "{}@{} {}",
            manifest.name(),
            manifest.version(),
            manifest.root
        )];
        if deps.is_empty() {
            lines.push("└── (empty)".to_string());
        }
        let last = deps.len().saturating_sub(1);
        for (i, (name, version)) in deps.iter().enumerate() {
            let branch = if i == last { "└──" } else { "├──" };
            lines.push(format!(
                "{branch} {name}@{}",
                version.trim_start_matches(['^', '~'])
            ));
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }

    fn init(&self, state: &mut ShellState) -> Result<CommandOutput> {
        let path = format!("{}/package.json", state.cwd.trim_end_matches('/'));
        if state.vfs.exists(&path) {
            return Err(DevtermError::Command(format!("{path} already exists")));
        }
        let name = devterm_vfs::file_name(&state.cwd).to_string();
        let body = serde_json::json!({
            "name": name,
            "version": "1.0.0",
            "scripts": { "test": "echo \"Error: no test specified\" && exit 1" },
        });
        let mut text = serde_json::to_string_pretty(&body)?;
        text.push('\n');
        state.vfs.write(&path, &text)?;
        Ok(CommandOutput::Text(format!("Wrote to {path}:\n\n{text}").trim_end().to_string()))
    }
}

impl Command for NodePackageCmd {
    fn name(&self) -> &str {
        self.tool
    }
    fn description(&self) -> &str {
        self.description
    }
    fn usage(&self) -> &str {
        self.usage
    }
    fn category(&self) -> Category {
        Category::Package
    }
    fn latency(&self, args: &[&str]) -> Duration {
        match args.first() {
            None if self.tool != "npm" => INSTALL_LATENCY,
            Some(&("install" | "i" | "add" | "ci" | "uninstall" | "remove" | "rm")) => {
                INSTALL_LATENCY
            },
            Some(&("run" | "test" | "start" | "t")) => SCRIPT_LATENCY,
            _ => Duration::ZERO,
        }
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((&sub, rest)) = args.split_first() else {
            if self.tool == "npm" {
                return Err(DevtermError::usage(self.usage));
            }
            return self.install(&[], state);
        };
        match sub {
            "-v" | "--version" | "version" => Ok(CommandOutput::text(self.version)),
            "install" | "i" | "ci" => self.install(rest, state),
            "add" => {
                if positional(rest).is_empty() {
                    return Err(DevtermError::usage(&format!("{} add <pkg...>", self.tool)));
                }
                self.install(rest, state)
            },
            "uninstall" | "remove" | "rm" | "un" => self.uninstall(rest, state),
            "run" | "run-script" => match rest.first() {
                Some(script) => self.run_script(script, state),
                None => {
                    let manifest = Manifest::load(state)?;
                    let mut lines = vec![format!("Scripts available in {}:", manifest.name())];
                    for name in manifest.script_names() {
                        let body = manifest.script(name).unwrap_or_default();
                        lines.push(format!("  {name}\n    {body}"));
                    }
                    Ok(CommandOutput::Text(lines.join("\n")))
                },
            },
            "test" | "t" | "start" => self.run_script(if sub == "t" { "test" } else { sub }, state),
            "list" | "ls" => self.list(state),
            "init" => self.init(state),
            script if self.tool != "npm" => self.run_script(script, state),
            other => Err(DevtermError::Command(format!(
                "npm: unknown command \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// pip
// ---------------------------------------------------------------------------

struct PipCmd;

impl PipCmd {
    /// Installed `(name, version)` pairs from the `.dist-info` directories.
    fn installed(state: &mut ShellState) -> Result<Vec<(String, String)>> {
        if !state.vfs.exists(SITE_PACKAGES) {
            return Ok(Vec::new());
        }
        let mut pkgs: Vec<(String, String)> = state
            .vfs
            .list(SITE_PACKAGES)?
            .into_iter()
            .filter_map(|e| {
                let stem = e.name.strip_suffix(".dist-info")?;
                let (name, version) = stem.rsplit_once('-')?;
                Some((name.to_string(), version.to_string()))
            })
            .collect();
        pkgs.sort();
        Ok(pkgs)
    }

    fn install(names: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let mut requested: Vec<String> = Vec::new();
        let mut iter = names.iter();
        while let Some(&arg) = iter.next() {
            if arg == "-r" || arg == "--requirement" {
                let file = iter
                    .next()
                    .ok_or_else(|| DevtermError::usage("pip install -r <file>"))?;
                let (_, content) = state.read_file(file)?;
                requested.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .map(String::from),
                );
            } else if !arg.starts_with('-') {
                requested.push(arg.to_string());
            }
        }
        if requested.is_empty() {
            return Err(DevtermError::usage("pip install <package...> | -r <file>"));
        }
        state.vfs.mkdir_all(SITE_PACKAGES)?;
        let mut installed = Vec::new();
        for spec in &requested {
            let (name, version) = match spec.split_once("==") {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (spec.trim(), "1.0.0"),
            };
            let name = name.to_lowercase();
            for (existing, old) in Self::installed(state)? {
                if existing == name {
                    state
                        .vfs
                        .delete(&format!("{SITE_PACKAGES}/{existing}-{old}.dist-info"));
                }
            }
            state
                .vfs
                .mkdir_all(&format!("{SITE_PACKAGES}/{name}-{version}.dist-info"))?;
            installed.push(format!("{name}-{version}"));
        }
        Ok(CommandOutput::lines()
            .info(format!("Collecting {}", requested.join(" ")))
            .success(format!("Successfully installed {}", installed.join(" ")))
            .build())
    }
}

impl Command for PipCmd {
    fn name(&self) -> &str {
        "pip"
    }
    fn description(&self) -> &str {
        "Python package installer"
    }
    fn usage(&self) -> &str {
        "pip <install|uninstall|list|freeze|show|--version> [args]"
    }
    fn category(&self) -> Category {
        Category::Package
    }
    fn aliases(&self) -> &[&str] {
        &["pip3"]
    }
    fn latency(&self, args: &[&str]) -> Duration {
        match args.first() {
            Some(&("install" | "uninstall")) => INSTALL_LATENCY,
            _ => Duration::ZERO,
        }
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((&sub, rest)) = args.split_first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        match sub {
            "--version" | "-V" => Ok(CommandOutput::text(format!(
                "pip 24.0 from {SITE_PACKAGES}/pip (python 3.12)"
            ))),
            "install" => Self::install(rest, state),
            "uninstall" => {
                let names = positional(rest);
                if names.is_empty() {
                    return Err(DevtermError::usage("pip uninstall <package...>"));
                }
                let installed = Self::installed(state)?;
                let mut out = CommandOutput::lines();
                for name in names {
                    let name = name.to_lowercase();
                    match installed.iter().find(|(n, _)| *n == name) {
                        Some((n, v)) => {
                            state.vfs.delete(&format!("{SITE_PACKAGES}/{n}-{v}.dist-info"));
                            out = out.success(format!("Successfully uninstalled {n}-{v}"));
                        },
                        None => {
                            out = out.warning(format!(
                                "WARNING: Skipping {name} as it is not installed."
                            ));
                        },
                    }
                }
                Ok(out.build())
            },
            "list" => {
                let rows = Self::installed(state)?
                    .into_iter()
                    .map(|(n, v)| vec![n, v])
                    .collect();
                Ok(CommandOutput::Table {
                    headers: vec!["Package".to_string(), "Version".to_string()],
                    rows,
                })
            },
            "freeze" => {
                let lines: Vec<String> = Self::installed(state)?
                    .into_iter()
                    .map(|(n, v)| format!("{n}=={v}"))
                    .collect();
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            "show" => {
                let name = rest
                    .first()
                    .ok_or_else(|| DevtermError::usage("pip show <package>"))?
                    .to_lowercase();
                let installed = Self::installed(state)?;
                let (n, v) = installed.iter().find(|(n, _)| *n == name).ok_or_else(|| {
                    DevtermError::Command(format!("WARNING: Package(s) not found: {name}"))
                })?;
                Ok(CommandOutput::Text(format!(
                    "Name: {n}\nVersion: {v}\nLocation: {SITE_PACKAGES}"
                )))
            },
            other => Err(DevtermError::Command(format!(
                "ERROR: unknown command \"{other}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CommandRegistry, ShellState) {
        (CommandRegistry::with_builtins(), ShellState::in_memory().unwrap())
    }

    fn exec(reg: &CommandRegistry, state: &mut ShellState, line: &str) -> Result<CommandOutput> {
        reg.execute(line, state)
    }

    fn text(out: CommandOutput) -> String {
        out.render()
    }

    fn manifest(state: &mut ShellState) -> Value {
        let text = state
            .vfs
            .read_to_string("/home/developer/project/package.json")
            .unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn npm_install_adds_dependency() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "npm install lodash").unwrap());
        assert!(out.contains("+ lodash@4.17.21"));
        assert!(out.ends_with("added 1 package in 1s"));
        let json = manifest(&mut st);
        assert_eq!(json["dependencies"]["lodash"], "^4.17.21");
        assert_eq!(json["dependencies"]["react"], "^18.2.0");
        assert!(st.vfs.exists("/home/developer/project/node_modules/lodash/package.json"));
    }

    #[test]
    fn npm_install_dev_and_pinned() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "npm i -D @types/node@20.11.0").unwrap();
        let json = manifest(&mut st);
        assert_eq!(json["devDependencies"]["@types/node"], "^20.11.0");
        assert!(json["dependencies"].get("@types/node").is_none());
    }

    #[test]
    fn install_works_from_subdirectory() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "cd src").unwrap();
        exec(&reg, &mut st, "yarn add zod").unwrap();
        assert_eq!(manifest(&mut st)["dependencies"]["zod"], "^3.23.0");
    }

    #[test]
    fn bare_install_materializes_all() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "npm install").unwrap());
        assert_eq!(out, "added 6 packages in 1s");
        assert!(st.vfs.exists("/home/developer/project/node_modules/vite"));
    }

    #[test]
    fn uninstall_removes() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "npm install lodash").unwrap();
        exec(&reg, &mut st, "pnpm remove lodash").unwrap();
        assert!(manifest(&mut st)["dependencies"].get("lodash").is_none());
        assert!(!st.vfs.exists("/home/developer/project/node_modules/lodash"));
    }

    #[test]
    fn npm_run_checks_script() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "npm run build").unwrap());
        assert!(out.starts_with("> my-app@0.1.0 build\n> vite build"));
        let err = exec(&reg, &mut st, "npm run deploy").unwrap_err();
        assert!(err.to_string().contains("missing script: \"deploy\""));
        assert!(text(exec(&reg, &mut st, "npm run").unwrap()).contains("  dev\n    vite"));
    }

    #[test]
    fn yarn_runs_script_shorthand() {
        let (reg, mut st) = setup();
        assert!(text(exec(&reg, &mut st, "yarn lint").unwrap()).contains("> eslint src"));
    }

    #[test]
    fn outside_project_errors() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "cd /tmp").unwrap();
        assert!(exec(&reg, &mut st, "npm install lodash").is_err());
        let out = text(exec(&reg, &mut st, "npm init -y").unwrap());
        assert!(out.starts_with("Wrote to /tmp/package.json"));
        assert!(exec(&reg, &mut st, "npm install lodash").is_ok());
    }

    #[test]
    fn npm_list_tree() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "npm ls").unwrap());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "my-app@0.1.0 /home/developer/project");
        assert_eq!(lines[1], "├── eslint@8.57.0");
        assert_eq!(*lines.last().unwrap(), "└── vitest@1.5.0");
    }

    #[test]
    fn pip_lifecycle() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "pip install requests==2.31.0 flask").unwrap());
        assert!(out.ends_with("Successfully installed requests-2.31.0 flask-1.0.0"));
        assert_eq!(
            text(exec(&reg, &mut st, "pip freeze").unwrap()),
            "flask==1.0.0\nrequests==2.31.0"
        );
        exec(&reg, &mut st, "pip uninstall flask").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "pip freeze").unwrap()), "requests==2.31.0");
        assert!(text(exec(&reg, &mut st, "pip show requests").unwrap()).contains("Version: 2.31.0"));
    }

    #[test]
    fn pip_requirements_file() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "write requirements.txt numpy==1.26.4").unwrap();
        exec(&reg, &mut st, "pip install -r requirements.txt").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "pip freeze").unwrap()), "numpy==1.26.4");
    }

    #[test]
    fn spec_splitting() {
        assert_eq!(split_spec("lodash"), ("lodash", None));
        assert_eq!(split_spec("lodash@4"), ("lodash", Some("4")));
        assert_eq!(split_spec("@types/node"), ("@types/node", None));
        assert_eq!(split_spec("@types/node@20"), ("@types/node", Some("20")));
    }

    #[test]
    fn installs_declare_latency() {
        assert_eq!(NodePackageCmd::NPM.latency(&["install"]), INSTALL_LATENCY);
        assert_eq!(NodePackageCmd::NPM.latency(&["--version"]), Duration::ZERO);
        assert_eq!(PipCmd.latency(&["install"]), INSTALL_LATENCY);
    }
}
