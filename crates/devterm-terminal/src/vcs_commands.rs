//! `git` over the simulated repository model.

use std::time::Duration;

use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;
use devterm_types::time::format_ms;
use devterm_vfs::MemoryVfs;

use crate::interpreter::{Category, Command, CommandOutput, CommandRegistry, flag_value, has_flag, positional};
use crate::repo::{PushOutcome, Repository, repo_name_from_url};
use crate::state::ShellState;

const GIT_VERSION: &str = "git version 2.43.0";
const NETWORK_LATENCY: Duration = Duration::from_millis(800);

/// Register the version control commands.
pub fn register_vcs_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(GitCmd));
}

/// Repository containing the cwd, or the standard "not a git repository"
/// error.
fn repo_mut(state: &mut ShellState) -> Result<(&mut Repository, &mut MemoryVfs, &str)> {
    let root = state.repo_root().ok_or_else(|| {
        DevtermError::Command(
            "fatal: not a git repository (or any of the parent directories): .git".to_string(),
        )
    })?;
    let ShellState {
        repos, vfs, user, ..
    } = state;
    let repo = repos
        .get_mut(&root)
        .ok_or_else(|| DevtermError::Command(format!("repository at {root} vanished")))?;
    Ok((repo, vfs, user.as_str()))
}

// ---------------------------------------------------------------------------
// git
// ---------------------------------------------------------------------------

struct GitCmd;
impl Command for GitCmd {
    fn name(&self) -> &str {
        "git"
    }
    fn description(&self) -> &str {
        "Simulated version control"
    }
    fn usage(&self) -> &str {
        "git <init|status|add|commit|log|branch|checkout|switch|diff|reset|push|pull|clone|remote|stash> [args]"
    }
    fn category(&self) -> Category {
        Category::Vcs
    }
    fn latency(&self, args: &[&str]) -> Duration {
        match args.first() {
            Some(&"push") | Some(&"pull") | Some(&"clone") | Some(&"fetch") => NETWORK_LATENCY,
            _ => Duration::ZERO,
        }
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((&sub, rest)) = args.split_first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        match sub {
            "--version" | "version" => Ok(CommandOutput::text(GIT_VERSION)),
            "init" => git_init(state),
            "clone" => git_clone(rest, state),
            "status" => git_status(rest, state),
            "add" => git_add(rest, state),
            "commit" => git_commit(rest, state),
            "log" => git_log(rest, state),
            "branch" => git_branch(rest, state),
            "checkout" | "switch" => git_checkout(rest, state),
            "diff" => git_diff(rest, state),
            "reset" | "restore" => git_reset(rest, state),
            "push" => git_push(rest, state),
            "pull" | "fetch" => git_pull(sub, rest, state),
            "remote" => git_remote(rest, state),
            "stash" => git_stash(rest, state),
            other => Err(DevtermError::Command(format!(
                "git: '{other}' is not a git command. See 'git help'."
            ))),
        }
    }
}

fn git_init(state: &mut ShellState) -> Result<CommandOutput> {
    let root = state.cwd.clone();
    if state.repos.contains_key(&root) {
        return Ok(CommandOutput::text(format!(
            "Reinitialized existing Git repository in {root}/.git/"
        )));
    }
    let repo = Repository::init(&root, &mut state.vfs)?;
    state.repos.insert(root.clone(), repo);
    Ok(CommandOutput::text(format!(
        "Initialized empty Git repository in {root}/.git/"
    )))
}

fn git_clone(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let pos = positional(args);
    let Some(&url) = pos.first() else {
        return Err(DevtermError::usage("git clone <url> [directory]"));
    };
    let dir = pos
        .get(1)
        .map_or_else(|| repo_name_from_url(url), |d| d.to_string());
    let root = state.resolve(&dir);
    let repo = Repository::clone_from(url, &root, &mut state.vfs, &state.user)?;
    state.repos.insert(root, repo);
    Ok(CommandOutput::lines()
        .info(format!("Cloning into '{dir}'..."))
        .info("remote: Enumerating objects: 3, done.")
        .info("Receiving objects: 100% (3/3), done.")
        .success("done.")
        .build())
}

fn git_status(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let short = has_flag(args, 's', "short");
    let (repo, vfs, _) = repo_mut(state)?;
    let status = repo.status(vfs);

    if short {
        let mut lines = Vec::new();
        for (change, path) in &status.staged {
            lines.push(format!("{}  {path}", short_code(*change)));
        }
        for (change, path) in &status.unstaged {
            lines.push(format!(" {} {path}", short_code(*change)));
        }
        for path in &status.untracked {
            lines.push(format!("?? {path}"));
        }
        return Ok(CommandOutput::Text(lines.join("\n")));
    }

    let mut out = CommandOutput::lines().info(format!("On branch {}", repo.branch()));
    if repo.head().is_none() {
        out.push(OutputLevel::Info, "\nNo commits yet");
    }
    if status.is_clean() {
        out.push(OutputLevel::Success, "nothing to commit, working tree clean");
        return Ok(out.build());
    }
    if !status.staged.is_empty() {
        out.push(OutputLevel::Info, "Changes to be committed:");
        for (change, path) in &status.staged {
            out.push(OutputLevel::Success, format!("\t{}:   {path}", change.label()));
        }
    }
    if !status.unstaged.is_empty() {
        out.push(OutputLevel::Info, "Changes not staged for commit:");
        for (change, path) in &status.unstaged {
            out.push(OutputLevel::Warning, format!("\t{}:   {path}", change.label()));
        }
    }
    if !status.untracked.is_empty() {
        out.push(OutputLevel::Info, "Untracked files:");
        for path in &status.untracked {
            out.push(OutputLevel::Warning, format!("\t{path}"));
        }
    }
    Ok(out.build())
}

fn short_code(change: crate::repo::Change) -> char {
    match change {
        crate::repo::Change::Added => 'A',
        crate::repo::Change::Modified => 'M',
        crate::repo::Change::Deleted => 'D',
    }
}

fn git_add(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    if args.is_empty() {
        return Err(DevtermError::Command(
            "Nothing specified, nothing added. Maybe you wanted to say 'git add .'?".to_string(),
        ));
    }
    let all = has_flag(args, 'A', "all");
    let targets: Vec<String> = positional(args).iter().map(|p| state.resolve(p)).collect();
    let (repo, vfs, _) = repo_mut(state)?;
    let mut staged = 0;
    if all {
        staged += repo.add_all(vfs);
    }
    for target in &targets {
        staged += repo.add(target, vfs)?;
    }
    log::debug!("git add staged {staged} paths");
    Ok(CommandOutput::None)
}

fn git_commit(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let message = flag_value(args, "-m")
        .or_else(|| flag_value(args, "-am"))
        .or_else(|| flag_value(args, "--message"))
        .ok_or_else(|| DevtermError::usage("git commit [-a] -m <message>"))?;
    if message.trim().is_empty() {
        return Err(DevtermError::Command(
            "Aborting commit due to empty commit message.".to_string(),
        ));
    }
    let stage_tracked = args.iter().any(|a| *a == "-a" || *a == "--all" || *a == "-am");
    let (repo, vfs, user) = repo_mut(state)?;
    if stage_tracked {
        repo.add_tracked(vfs);
    }
    let commit = repo.commit(message, user)?;
    let n = commit.files.len();
    Ok(CommandOutput::lines()
        .success(format!("[{} {}] {}", commit.branch, commit.id, commit.message))
        .info(format!(
            " {n} file{} changed",
            if n == 1 { "" } else { "s" }
        ))
        .build())
}

fn git_log(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let oneline = args.contains(&"--oneline");
    let limit = flag_value(args, "-n")
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX);
    let (repo, _, _) = repo_mut(state)?;
    let commits = repo.log();
    if commits.is_empty() {
        return Err(DevtermError::Command(format!(
            "fatal: your current branch '{}' does not have any commits yet",
            repo.branch()
        )));
    }
    let mut lines = Vec::new();
    for c in commits.into_iter().take(limit) {
        if oneline {
            lines.push(format!("{} {}", c.id, c.message));
        } else {
            lines.push(format!("commit {}", c.id));
            lines.push(format!("Author: {}", c.author));
            lines.push(format!("Date:   {}", format_ms(c.timestamp)));
            lines.push(String::new());
            lines.push(format!("    {}", c.message));
            lines.push(String::new());
        }
    }
    Ok(CommandOutput::Text(lines.join("\n").trim_end().to_string()))
}

fn git_branch(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let (repo, _, _) = repo_mut(state)?;
    if let Some(name) = flag_value(args, "-d").or_else(|| flag_value(args, "-D")) {
        repo.delete_branch(name)?;
        return Ok(CommandOutput::text(format!("Deleted branch {name}.")));
    }
    match positional(args).first() {
        Some(name) => {
            repo.create_branch(name)?;
            Ok(CommandOutput::None)
        },
        None => {
            let current = repo.branch().to_string();
            let lines: Vec<String> = repo
                .branches()
                .map(|b| {
                    if b == current {
                        format!("* {b}")
                    } else {
                        format!("  {b}")
                    }
                })
                .collect();
            Ok(CommandOutput::Text(lines.join("\n")))
        },
    }
}

fn git_checkout(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let create = args.first().is_some_and(|a| *a == "-b" || *a == "-c");
    let Some(&name) = positional(args).first() else {
        return Err(DevtermError::usage("git checkout [-b] <branch>"));
    };
    let (repo, vfs, _) = repo_mut(state)?;
    if create {
        repo.create_branch(name)?;
        repo.checkout(name, vfs)?;
        return Ok(CommandOutput::text(format!("Switched to a new branch '{name}'")));
    }
    if repo.branch() == name {
        return Ok(CommandOutput::text(format!("Already on '{name}'")));
    }
    repo.checkout(name, vfs)?;
    Ok(CommandOutput::text(format!("Switched to branch '{name}'")))
}

fn git_diff(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let staged = args.iter().any(|a| *a == "--staged" || *a == "--cached");
    let (repo, vfs, _) = repo_mut(state)?;
    let lines = repo.diff(vfs, staged);
    let mut out = CommandOutput::lines();
    for line in lines {
        let level = if line.starts_with('+') && !line.starts_with("+++") {
            OutputLevel::Success
        } else if line.starts_with('-') && !line.starts_with("---") {
            OutputLevel::Error
        } else {
            OutputLevel::Info
        };
        out.push(level, line);
    }
    Ok(out.build())
}

fn git_reset(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let targets: Vec<String> = positional(args).iter().map(|p| state.resolve(p)).collect();
    if targets.is_empty() {
        return Err(DevtermError::usage("git reset <path...>"));
    }
    let (repo, _, _) = repo_mut(state)?;
    let mut lines = Vec::new();
    for target in targets {
        if let Some(rel) = repo.relative(&target)
            && repo.unstage(&rel)
        {
            lines.push(format!("M\t{rel}"));
        }
    }
    if lines.is_empty() {
        return Ok(CommandOutput::None);
    }
    lines.insert(0, "Unstaged changes after reset:".to_string());
    Ok(CommandOutput::Text(lines.join("\n")))
}

fn git_push(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let remote = positional(args).first().copied().unwrap_or("origin");
    let (repo, _, _) = repo_mut(state)?;
    let branch = repo.branch().to_string();
    let url = repo.remotes().get(remote).cloned().unwrap_or_default();
    match repo.push(remote)? {
        PushOutcome::UpToDate => Ok(CommandOutput::text("Everything up-to-date")),
        PushOutcome::Pushed { from, to } => {
            let range = match from {
                Some(from) => format!("   {from}..{to}  {branch} -> {branch}"),
                None => format!(" * [new branch]      {branch} -> {branch}"),
            };
            Ok(CommandOutput::lines()
                .info(format!("To {url}"))
                .success(range)
                .build())
        },
    }
}

fn git_pull(sub: &str, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let remote = positional(args).first().copied().unwrap_or("origin");
    let (repo, _, _) = repo_mut(state)?;
    let Some(url) = repo.remotes().get(remote) else {
        return Err(DevtermError::Command(format!(
            "fatal: '{remote}' does not appear to be a git repository"
        )));
    };
    if sub == "fetch" {
        return Ok(CommandOutput::text(format!("From {url}")));
    }
    Ok(CommandOutput::lines()
        .info(format!("From {url}"))
        .success("Already up to date.")
        .build())
}

fn git_remote(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let (repo, _, _) = repo_mut(state)?;
    match args {
        ["add", name, url] => {
            repo.add_remote(name, url)?;
            Ok(CommandOutput::None)
        },
        ["remove" | "rm", name] => {
            repo.remove_remote(name)?;
            Ok(CommandOutput::None)
        },
        [] | ["-v"] => {
            let verbose = !args.is_empty();
            let mut lines = Vec::new();
            for (name, url) in repo.remotes() {
                if verbose {
                    lines.push(format!("{name}\t{url} (fetch)"));
                    lines.push(format!("{name}\t{url} (push)"));
                } else {
                    lines.push(name.clone());
                }
            }
            Ok(CommandOutput::Text(lines.join("\n")))
        },
        _ => Err(DevtermError::usage("git remote [-v] | add <name> <url> | remove <name>")),
    }
}

fn git_stash(args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
    let (repo, vfs, _) = repo_mut(state)?;
    match args.first().copied() {
        None | Some("push") | Some("save") => {
            let branch = repo.branch().to_string();
            match repo.stash_push(vfs)? {
                0 => Ok(CommandOutput::text("No local changes to save")),
                _ => Ok(CommandOutput::text(format!(
                    "Saved working directory and index state WIP on {branch}"
                ))),
            }
        },
        Some("pop") | Some("apply") => {
            let n = repo.stash_pop(vfs)?;
            Ok(CommandOutput::text(format!(
                "Restored {n} file{} from stash",
                if n == 1 { "" } else { "s" }
            )))
        },
        Some("list") => {
            let lines: Vec<String> = repo
                .stash_list()
                .rev()
                .enumerate()
                .map(|(i, s)| format!("stash@{{{i}}}: {}", s.message))
                .collect();
            Ok(CommandOutput::Text(lines.join("\n")))
        },
        Some(other) => Err(DevtermError::Command(format!(
            "git stash: unknown subcommand '{other}'"
        ))),
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

    #[test]
    fn outside_repo_errors() {
        let (reg, mut st) = setup();
        let err = exec(&reg, &mut st, "git status").unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn init_add_commit_status() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "git init").unwrap());
        assert_eq!(
            out,
            "Initialized empty Git repository in /home/developer/project/.git/"
        );
        let status = text(exec(&reg, &mut st, "git status").unwrap());
        assert!(status.contains("Untracked files:"));
        assert!(status.contains("\tpackage.json"));

        exec(&reg, &mut st, "git add .").unwrap();
        let status = text(exec(&reg, &mut st, "git status").unwrap());
        assert!(status.contains("Changes to be committed:"));
        assert!(status.contains("new file:   README.md"));

        let out = text(exec(&reg, &mut st, "git commit -m 'initial commit'").unwrap());
        assert!(out.starts_with("[main "));
        assert!(out.contains("] initial commit"));
        assert!(text(exec(&reg, &mut st, "git status").unwrap())
            .contains("nothing to commit, working tree clean"));
    }

    #[test]
    fn status_from_subdirectory() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "cd src").unwrap();
        let short = text(exec(&reg, &mut st, "git status -s").unwrap());
        assert!(short.contains("?? src/index.js"));
    }

    #[test]
    fn commit_requires_message_and_changes() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        assert!(matches!(exec(&reg, &mut st, "git commit"), Err(DevtermError::Usage(_))));
        assert!(exec(&reg, &mut st, "git commit -m x").is_err());
    }

    #[test]
    fn commit_all_stages_tracked() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "git add .").unwrap();
        exec(&reg, &mut st, "git commit -m first").unwrap();
        exec(&reg, &mut st, "write README.md changed").unwrap();
        exec(&reg, &mut st, "git commit -a -m second").unwrap();
        let log = text(exec(&reg, &mut st, "git log --oneline").unwrap());
        let msgs: Vec<&str> = log.lines().map(|l| &l[8..]).collect();
        assert_eq!(msgs, ["second", "first"]);
    }

    #[test]
    fn branch_and_checkout() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "git add .").unwrap();
        exec(&reg, &mut st, "git commit -m init").unwrap();
        let out = text(exec(&reg, &mut st, "git checkout -b feature").unwrap());
        assert_eq!(out, "Switched to a new branch 'feature'");
        assert_eq!(text(exec(&reg, &mut st, "git branch").unwrap()), "* feature\n  main");
        assert_eq!(text(exec(&reg, &mut st, "git checkout feature").unwrap()), "Already on 'feature'");
        exec(&reg, &mut st, "git switch main").unwrap();
        exec(&reg, &mut st, "git branch -d feature").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "git branch").unwrap()), "* main");
    }

    #[test]
    fn diff_shows_changes() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "git add .").unwrap();
        exec(&reg, &mut st, "git commit -m init").unwrap();
        exec(&reg, &mut st, "write src/utils.js export const x = 1;").unwrap();
        let out = exec(&reg, &mut st, "git diff").unwrap();
        let CommandOutput::Lines(lines) = out else {
            panic!("expected lines");
        };
        assert!(lines.iter().any(|(lvl, l)| *lvl == OutputLevel::Success && l == "+export const x = 1;"));
        assert!(lines.iter().any(|(lvl, _)| *lvl == OutputLevel::Error));
    }

    #[test]
    fn push_pull_remote() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        assert!(exec(&reg, &mut st, "git push").is_err());
        exec(&reg, &mut st, "git remote add origin https://github.com/me/app.git").unwrap();
        assert_eq!(
            text(exec(&reg, &mut st, "git remote -v").unwrap()),
            "origin\thttps://github.com/me/app.git (fetch)\norigin\thttps://github.com/me/app.git (push)"
        );
        exec(&reg, &mut st, "git add .").unwrap();
        exec(&reg, &mut st, "git commit -m init").unwrap();
        let out = text(exec(&reg, &mut st, "git push").unwrap());
        assert!(out.contains("[new branch]"));
        assert_eq!(text(exec(&reg, &mut st, "git push").unwrap()), "Everything up-to-date");
        assert!(text(exec(&reg, &mut st, "git pull").unwrap()).contains("Already up to date."));
    }

    #[test]
    fn clone_creates_directory() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "cd ~").unwrap();
        exec(&reg, &mut st, "git clone https://github.com/acme/widget.git").unwrap();
        assert!(st.vfs.exists("/home/developer/widget/README.md"));
        exec(&reg, &mut st, "cd widget").unwrap();
        assert_eq!(
            text(exec(&reg, &mut st, "git log --oneline").unwrap()).len(),
            "abcdefg Initial commit".len()
        );
    }

    #[test]
    fn stash_cycle() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "git add .").unwrap();
        exec(&reg, &mut st, "git commit -m init").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "git stash").unwrap()), "No local changes to save");
        exec(&reg, &mut st, "write README.md wip").unwrap();
        exec(&reg, &mut st, "git stash").unwrap();
        assert!(text(exec(&reg, &mut st, "cat README.md").unwrap()).starts_with("# my-app"));
        assert!(text(exec(&reg, &mut st, "git stash list").unwrap()).starts_with("stash@{0}: WIP on main"));
        exec(&reg, &mut st, "git stash pop").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "cat README.md").unwrap()).trim_end(), "wip");
    }

    #[test]
    fn reset_unstages_path() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "git init").unwrap();
        exec(&reg, &mut st, "git add README.md").unwrap();
        let out = text(exec(&reg, &mut st, "git reset README.md").unwrap());
        assert_eq!(out, "Unstaged changes after reset:\nM\tREADME.md");
        assert!(text(exec(&reg, &mut st, "git status -s").unwrap()).contains("?? README.md"));
    }

    #[test]
    fn unknown_subcommand() {
        let (reg, mut st) = setup();
        assert!(exec(&reg, &mut st, "git frobnicate").is_err());
        assert!(matches!(exec(&reg, &mut st, "git"), Err(DevtermError::Usage(_))));
        assert_eq!(text(exec(&reg, &mut st, "git --version").unwrap()), GIT_VERSION);
    }

    #[test]
    fn network_subcommands_declare_latency() {
        assert_eq!(GitCmd.latency(&["push"]), NETWORK_LATENCY);
        assert_eq!(GitCmd.latency(&["status"]), Duration::ZERO);
    }
}
