//! File system commands over the VFS: ls, cd, pwd, cat, touch, mkdir, rm,
//! rmdir, cp, mv, write, tree, find, stat, head, tail, wc, grep, chmod, ln.

use devterm_types::error::{DevtermError, Result};
use devterm_types::time::{format_ms, to_datetime};
use devterm_vfs::{EntryKind, MemoryVfs, VirtualEntry, file_name, parent};
use regex::RegexBuilder;

use crate::interpreter::{
    Category, Command, CommandOutput, CommandRegistry, flag_value, has_flag, positional, require,
};
use crate::state::ShellState;

/// Register the file system commands.
pub fn register_file_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(LsCmd));
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(TouchCmd));
    reg.register(Box::new(MkdirCmd));
    reg.register(Box::new(RmCmd));
    reg.register(Box::new(RmdirCmd));
    reg.register(Box::new(CpCmd));
    reg.register(Box::new(MvCmd));
    reg.register(Box::new(WriteCmd));
    reg.register(Box::new(TreeCmd));
    reg.register(Box::new(FindCmd));
    reg.register(Box::new(StatCmd));
    reg.register(Box::new(HeadCmd));
    reg.register(Box::new(TailCmd));
    reg.register(Box::new(WcCmd));
    reg.register(Box::new(GrepCmd));
    reg.register(Box::new(ChmodCmd));
    reg.register(Box::new(LnCmd));
}

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn lookup(vfs: &MemoryVfs, path: &str) -> Result<VirtualEntry> {
    vfs.peek(path)
        .cloned()
        .ok_or_else(|| DevtermError::Vfs(format!("no such file or directory: {path}")))
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}M", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Delete `path` and everything below it, deepest first.
fn remove_tree(vfs: &mut MemoryVfs, path: &str) -> usize {
    let mut doomed = vfs.paths_with_prefix(path);
    doomed.sort_by_key(|p| std::cmp::Reverse(p.len()));
    let mut removed = 0;
    for p in doomed {
        if vfs.delete(&p) {
            removed += 1;
        }
    }
    if vfs.delete(path) {
        removed += 1;
    }
    removed
}

/// Copy a file, symlink or directory tree.
fn copy_tree(vfs: &mut MemoryVfs, src: &str, dst: &str) -> Result<()> {
    let entry = lookup(vfs, src)?;
    match entry.kind {
        EntryKind::File => vfs.write(dst, entry.content.as_deref().unwrap_or_default()),
        EntryKind::Symlink => vfs
            .create(dst, EntryKind::Symlink, entry.content.as_deref())
            .map(|_| ()),
        EntryKind::Directory => {
            vfs.mkdir_all(dst)?;
            for child in entry.child_paths.unwrap_or_default() {
                copy_tree(vfs, &child, &join(dst, file_name(&child)))?;
            }
            Ok(())
        },
    }
}

/// `dst` itself, or `dst/<name of src>` when `dst` is an existing directory.
fn destination(vfs: &MemoryVfs, src: &str, dst: &str) -> String {
    match vfs.peek(dst) {
        Some(e) if e.is_dir() => join(dst, file_name(src)),
        _ => dst.to_string(),
    }
}

/// Shell glob with `*` and `?`.
fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Text of a file argument, following symlinks.
fn read_text(state: &mut ShellState, file: Option<&str>, usage: &str) -> Result<String> {
    let file = file.ok_or_else(|| DevtermError::usage(usage))?;
    Ok(state.read_file(file)?.1)
}

/// `-n N`, `-nN` or `-N` line counts for head/tail.
fn line_count<'a>(args: &[&'a str]) -> Result<(usize, Option<&'a str>)> {
    let mut n = 10;
    let mut file = None;
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        let value = if arg == "-n" {
            iter.next().copied()
        } else if let Some(v) = arg.strip_prefix("-n") {
            Some(v)
        } else if let Some(v) = arg.strip_prefix('-').filter(|v| !v.is_empty()) {
            Some(v)
        } else {
            file = Some(arg);
            continue;
        };
        n = value
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| DevtermError::Command(format!("invalid line count: {arg}")))?;
    }
    Ok((n, file))
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [-l] [-a] [path]"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["list", "dir", "ll"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let long = has_flag(args, 'l', "long");
        let all = has_flag(args, 'a', "all");
        let path = positional(args)
            .first()
            .map_or_else(|| state.cwd.clone(), |p| state.resolve(p));

        let entry = lookup(&state.vfs, &path)?;
        let entries = if entry.is_dir() {
            state.vfs.list(&path)?
        } else {
            vec![entry]
        };
        let visible: Vec<&VirtualEntry> = entries
            .iter()
            .filter(|e| all || !e.name.starts_with('.'))
            .collect();
        if visible.is_empty() {
            return Ok(CommandOutput::Text("(empty)".to_string()));
        }

        if !long {
            let names: Vec<String> = visible
                .iter()
                .map(|e| match e.kind {
                    EntryKind::Directory => format!("{}/", e.name),
                    EntryKind::Symlink => format!("{}@", e.name),
                    EntryKind::File => e.name.clone(),
                })
                .collect();
            return Ok(CommandOutput::Text(names.join("  ")));
        }

        let total: u64 = visible.iter().map(|e| e.size).sum();
        let mut lines = vec![format!("total {}", format_size(total))];
        for e in visible {
            let links = if e.is_dir() { e.child_count() + 2 } else { 1 };
            let mut name = e.name.clone();
            if e.kind == EntryKind::Symlink {
                name.push_str(&format!(" -> {}", e.content.as_deref().unwrap_or_default()));
            }
            lines.push(format!(
                "{} {links:>2} {} {} {:>6} {} {name}",
                e.mode_string(),
                e.owner,
                e.group,
                e.size,
                to_datetime(e.modified_at).format("%b %e %H:%M"),
            ));
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change working directory"
    }
    fn usage(&self) -> &str {
        "cd [path|-]"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let target = match args.first() {
            None => state.home.clone(),
            Some(&"-") => state
                .environment
                .get("OLDPWD")
                .cloned()
                .ok_or_else(|| DevtermError::Command("cd: OLDPWD not set".to_string()))?,
            Some(p) => state.resolve(p),
        };
        match state.vfs.peek(&target) {
            Some(e) if e.is_dir() => {},
            Some(_) => return Err(DevtermError::Command(format!("cd: not a directory: {target}"))),
            None => {
                return Err(DevtermError::Command(format!(
                    "cd: no such file or directory: {target}"
                )));
            },
        }
        let announce = args.first() == Some(&"-");
        state.set_cwd(target);
        if announce {
            Ok(CommandOutput::Text(state.cwd.clone()))
        } else {
            Ok(CommandOutput::None)
        }
    }
}

// ---------------------------------------------------------------------------
// pwd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, _args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(state.cwd.clone()))
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Display file contents"
    }
    fn usage(&self) -> &str {
        "cat [-n] <file...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["type"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let files = positional(args);
        if files.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let mut text = String::new();
        for file in files {
            text.push_str(&state.read_file(file)?.1);
        }
        if has_flag(args, 'n', "number") {
            text = text
                .lines()
                .enumerate()
                .map(|(i, l)| format!("{:>6}  {l}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
        }
        Ok(CommandOutput::Text(text.trim_end_matches('\n').to_string()))
    }
}

// ---------------------------------------------------------------------------
// touch
// ---------------------------------------------------------------------------

struct TouchCmd;
impl Command for TouchCmd {
    fn name(&self) -> &str {
        "touch"
    }
    fn description(&self) -> &str {
        "Create empty files or update timestamps"
    }
    fn usage(&self) -> &str {
        "touch <file...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let files = positional(args);
        if files.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for file in files {
            let path = state.resolve(file);
            if !state.vfs.touch(&path) {
                state.vfs.create(&path, EntryKind::File, Some(""))?;
            }
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// mkdir
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create directories"
    }
    fn usage(&self) -> &str {
        "mkdir [-p] <path...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["md"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let parents = has_flag(args, 'p', "parents");
        let dirs = positional(args);
        if dirs.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for dir in dirs {
            let path = state.resolve(dir);
            if parents {
                state.vfs.mkdir_all(&path)?;
            } else {
                state.vfs.create(&path, EntryKind::Directory, None)?;
            }
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// rm / rmdir
// ---------------------------------------------------------------------------

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Remove files or directories"
    }
    fn usage(&self) -> &str {
        "rm [-r] [-f] <path...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["del"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let recursive = has_flag(args, 'r', "recursive") || has_flag(args, 'R', "recursive");
        let force = has_flag(args, 'f', "force");
        let targets = positional(args);
        if targets.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for target in targets {
            let path = state.resolve(target);
            if path == "/" {
                return Err(DevtermError::Command("rm: refusing to remove '/'".to_string()));
            }
            match state.vfs.peek(&path) {
                None if force => {},
                None => {
                    return Err(DevtermError::Vfs(format!(
                        "no such file or directory: {path}"
                    )));
                },
                Some(e) if e.is_dir() && !recursive => {
                    return Err(DevtermError::Command(format!(
                        "rm: cannot remove '{target}': is a directory (use -r)"
                    )));
                },
                Some(_) => {
                    remove_tree(&mut state.vfs, &path);
                    if state.cwd == path || state.cwd.starts_with(&format!("{path}/")) {
                        let fallback = parent(&path).to_string();
                        state.set_cwd(fallback);
                    }
                },
            }
        }
        Ok(CommandOutput::None)
    }
}

struct RmdirCmd;
impl Command for RmdirCmd {
    fn name(&self) -> &str {
        "rmdir"
    }
    fn description(&self) -> &str {
        "Remove empty directories"
    }
    fn usage(&self) -> &str {
        "rmdir <dir...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for dir in args {
            let path = state.resolve(dir);
            let entry = lookup(&state.vfs, &path)?;
            if !entry.is_dir() {
                return Err(DevtermError::Command(format!("rmdir: not a directory: {dir}")));
            }
            if entry.child_count() > 0 {
                return Err(DevtermError::Command(format!(
                    "rmdir: directory not empty: {dir}"
                )));
            }
            state.vfs.delete(&path);
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// cp / mv
// ---------------------------------------------------------------------------

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy files or directories"
    }
    fn usage(&self) -> &str {
        "cp [-r] <src> <dst>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["copy"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let paths = positional(args);
        let [src, dst] = paths[..] else {
            return Err(DevtermError::usage(self.usage()));
        };
        let src = state.resolve(src);
        let dst = destination(&state.vfs, &src, &state.resolve(dst));
        let entry = lookup(&state.vfs, &src)?;
        if entry.is_dir() && !has_flag(args, 'r', "recursive") {
            return Err(DevtermError::Command(format!(
                "cp: -r not specified; omitting directory '{src}'"
            )));
        }
        if dst == src || dst.starts_with(&format!("{src}/")) {
            return Err(DevtermError::Command(format!(
                "cp: cannot copy '{src}' into itself"
            )));
        }
        copy_tree(&mut state.vfs, &src, &dst)?;
        Ok(CommandOutput::None)
    }
}

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move or rename files"
    }
    fn usage(&self) -> &str {
        "mv <src> <dst>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn aliases(&self) -> &[&str] {
        &["move", "ren"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let paths = positional(args);
        let [src, dst] = paths[..] else {
            return Err(DevtermError::usage(self.usage()));
        };
        let src = state.resolve(src);
        let dst = destination(&state.vfs, &src, &state.resolve(dst));
        if state.vfs.peek(&dst).is_some_and(|e| e.is_file()) && has_flag(args, 'f', "force") {
            state.vfs.delete(&dst);
        }
        state.vfs.rename(&src, &dst)?;
        if state.cwd == src || state.cwd.starts_with(&format!("{src}/")) {
            let moved = format!("{dst}{}", &state.cwd[src.len()..]);
            state.set_cwd(moved);
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// write
// ---------------------------------------------------------------------------

struct WriteCmd;
impl Command for WriteCmd {
    fn name(&self) -> &str {
        "write"
    }
    fn description(&self) -> &str {
        "Write (or append) text to a file"
    }
    fn usage(&self) -> &str {
        "write [-a] <file> <text...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let (append, rest) = match args.first() {
            Some(&"-a") | Some(&"--append") => (true, &args[1..]),
            _ => (false, args),
        };
        if rest.len() < 2 {
            return Err(DevtermError::usage(self.usage()));
        }
        let path = state.resolve(rest[0]);
        let mut text = rest[1..].join(" ");
        text.push('\n');
        if append && state.vfs.peek(&path).is_some_and(|e| e.is_file()) {
            let existing = state.vfs.read_to_string(&path)?;
            text = format!("{existing}{text}");
        }
        let len = text.len();
        state.vfs.write(&path, &text)?;
        Ok(CommandOutput::Text(format!("Wrote {len} bytes to {path}")))
    }
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

struct TreeCmd;
impl Command for TreeCmd {
    fn name(&self) -> &str {
        "tree"
    }
    fn description(&self) -> &str {
        "Display directory tree"
    }
    fn usage(&self) -> &str {
        "tree [-a] [-L depth] [path]"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let depth = match flag_value(args, "-L") {
            Some(d) => d
                .parse()
                .map_err(|_| DevtermError::Command(format!("tree: invalid level '{d}'")))?,
            None => usize::MAX,
        };
        let all = has_flag(args, 'a', "all");
        let root = args
            .iter()
            .enumerate()
            .find(|(i, a)| !a.starts_with('-') && (*i == 0 || args[i - 1] != "-L"))
            .map_or_else(|| state.cwd.clone(), |(_, p)| state.resolve(p));
        if !lookup(&state.vfs, &root)?.is_dir() {
            return Err(DevtermError::Command(format!("tree: not a directory: {root}")));
        }
        let mut walk = TreeWalk {
            lines: vec![root.clone()],
            dirs: 0,
            files: 0,
            all,
            depth,
        };
        walk.visit(&mut state.vfs, &root, "", 1)?;
        walk.lines
            .push(format!("\n{} directories, {} files", walk.dirs, walk.files));
        Ok(CommandOutput::Text(walk.lines.join("\n")))
    }
}

struct TreeWalk {
    lines: Vec<String>,
    dirs: u32,
    files: u32,
    all: bool,
    depth: usize,
}

impl TreeWalk {
    fn visit(&mut self, vfs: &mut MemoryVfs, dir: &str, prefix: &str, level: usize) -> Result<()> {
        if level > self.depth {
            return Ok(());
        }
        let entries: Vec<VirtualEntry> = vfs
            .list(dir)?
            .into_iter()
            .filter(|e| self.all || !e.name.starts_with('.'))
            .collect();
        let count = entries.len();
        for (i, entry) in entries.iter().enumerate() {
            let is_last = i == count - 1;
            let connector = if is_last { "└── " } else { "├── " };
            let suffix = if entry.is_dir() { "/" } else { "" };
            self.lines
                .push(format!("{prefix}{connector}{}{suffix}", entry.name));
            if entry.is_dir() {
                self.dirs += 1;
                let child_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                self.visit(vfs, &join(dir, &entry.name), &child_prefix, level + 1)?;
            } else {
                self.files += 1;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

struct FindCmd;
impl Command for FindCmd {
    fn name(&self) -> &str {
        "find"
    }
    fn description(&self) -> &str {
        "Find files by name pattern"
    }
    fn usage(&self) -> &str {
        "find [path] [-name glob] [-type f|d]"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let pattern = flag_value(args, "-name");
        let kind = match flag_value(args, "-type") {
            None => None,
            Some("f") => Some(EntryKind::File),
            Some("d") => Some(EntryKind::Directory),
            Some("l") => Some(EntryKind::Symlink),
            Some(other) => {
                return Err(DevtermError::Command(format!("find: unknown type '{other}'")));
            },
        };
        let root = match args.first() {
            Some(p) if !p.starts_with('-') => state.resolve(p),
            _ => state.cwd.clone(),
        };
        lookup(&state.vfs, &root)?;

        let results: Vec<String> = std::iter::once(root.clone())
            .chain(state.vfs.paths_with_prefix(&root))
            .filter(|p| {
                let Some(entry) = state.vfs.peek(p) else {
                    return false;
                };
                kind.is_none_or(|k| entry.kind == k)
                    && pattern.is_none_or(|g| glob_match(g, file_name(p)))
            })
            .collect();
        if results.is_empty() {
            Ok(CommandOutput::Text("(no matches)".to_string()))
        } else {
            Ok(CommandOutput::Text(results.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// stat
// ---------------------------------------------------------------------------

struct StatCmd;
impl Command for StatCmd {
    fn name(&self) -> &str {
        "stat"
    }
    fn description(&self) -> &str {
        "Show file metadata"
    }
    fn usage(&self) -> &str {
        "stat <path>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let path = state.resolve(require(args, self.usage())?);
        let entry = lookup(&state.vfs, &path)?;
        let kind = match entry.kind {
            EntryKind::File => "regular file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symbolic link",
        };
        let lines = [
            format!("  File: {path}"),
            format!("  Type: {kind}"),
            format!("  Size: {} ({})", entry.size, format_size(entry.size)),
            format!("Access: ({}) Uid: {} Gid: {}", entry.mode_string(), entry.owner, entry.group),
            format!("Access: {}", format_ms(entry.accessed_at)),
            format!("Modify: {}", format_ms(entry.modified_at)),
            format!(" Birth: {}", format_ms(entry.created_at)),
        ];
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// head / tail
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show first N lines of a file"
    }
    fn usage(&self) -> &str {
        "head [-n N] <file>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let (n, file) = line_count(args)?;
        let text = read_text(state, file, self.usage())?;
        let result: Vec<&str> = text.lines().take(n).collect();
        Ok(CommandOutput::Text(result.join("\n")))
    }
}

struct TailCmd;
impl Command for TailCmd {
    fn name(&self) -> &str {
        "tail"
    }
    fn description(&self) -> &str {
        "Show last N lines of a file"
    }
    fn usage(&self) -> &str {
        "tail [-n N] <file>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let (n, file) = line_count(args)?;
        let text = read_text(state, file, self.usage())?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(CommandOutput::Text(lines[start..].join("\n")))
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words, and bytes"
    }
    fn usage(&self) -> &str {
        "wc [-l|-w|-c] <file...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let mut mode = "all";
        let mut files = Vec::new();
        for &arg in args {
            match arg {
                "-l" => mode = "lines",
                "-w" => mode = "words",
                "-c" => mode = "bytes",
                _ => files.push(arg),
            }
        }
        if files.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let mut out = Vec::new();
        let mut totals = (0, 0, 0);
        for file in &files {
            let text = state.read_file(file)?.1;
            let counts = (text.lines().count(), text.split_whitespace().count(), text.len());
            totals = (totals.0 + counts.0, totals.1 + counts.1, totals.2 + counts.2);
            out.push(wc_line(mode, counts, file));
        }
        if files.len() > 1 {
            out.push(wc_line(mode, totals, "total"));
        }
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

fn wc_line(mode: &str, (lines, words, bytes): (usize, usize, usize), name: &str) -> String {
    match mode {
        "lines" => format!("{lines} {name}"),
        "words" => format!("{words} {name}"),
        "bytes" => format!("{bytes} {name}"),
        _ => format!("{lines:>8} {words:>8} {bytes:>8} {name}"),
    }
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search files for a regular expression"
    }
    fn usage(&self) -> &str {
        "grep [-i] [-n] [-v] [-c] [-r] <pattern> <file|dir...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let mut case_insensitive = false;
        let mut show_numbers = false;
        let mut invert = false;
        let mut count_only = false;
        let mut recursive = false;
        let mut positional = Vec::new();

        for &arg in args {
            match arg {
                "-i" => case_insensitive = true,
                "-n" => show_numbers = true,
                "-v" => invert = true,
                "-c" => count_only = true,
                "-r" | "-R" => recursive = true,
                _ => positional.push(arg),
            }
        }
        let Some((&pattern, targets)) = positional.split_first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        if targets.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;

        let mut files = Vec::new();
        for target in targets {
            let path = state.resolve(target);
            let entry = lookup(&state.vfs, &path)?;
            if entry.is_dir() {
                if !recursive {
                    return Err(DevtermError::Command(format!("grep: {target}: is a directory")));
                }
                files.extend(
                    state
                        .vfs
                        .paths_with_prefix(&path)
                        .into_iter()
                        .filter(|p| state.vfs.peek(p).is_some_and(VirtualEntry::is_file)),
                );
            } else {
                files.push(path);
            }
        }
        let label = files.len() > 1;

        let mut matches = Vec::new();
        let mut count = 0;
        for file in &files {
            let text = state.vfs.read_to_string(file)?;
            for (i, line) in text.lines().enumerate() {
                if re.is_match(line) == invert {
                    continue;
                }
                count += 1;
                let mut out = String::new();
                if label {
                    out.push_str(&format!("{file}:"));
                }
                if show_numbers {
                    out.push_str(&format!("{}:", i + 1));
                }
                out.push_str(line);
                matches.push(out);
            }
        }

        if count_only {
            Ok(CommandOutput::Text(count.to_string()))
        } else if matches.is_empty() {
            Ok(CommandOutput::Text("(no matches)".to_string()))
        } else {
            Ok(CommandOutput::Text(matches.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// chmod
// ---------------------------------------------------------------------------

/// Apply an octal (`755`) or symbolic (`+x`, `u-w`, `go=r`) mode to a
/// `rwxrwxrwx` permission string.
fn apply_mode(current: &str, mode: &str) -> Result<String> {
    let invalid = || DevtermError::Command(format!("chmod: invalid mode: '{mode}'"));
    if mode.len() == 3 && mode.chars().all(|c| ('0'..='7').contains(&c)) {
        return Ok(mode
            .chars()
            .map(|c| {
                let bits = c as u8 - b'0';
                format!(
                    "{}{}{}",
                    if bits & 4 != 0 { 'r' } else { '-' },
                    if bits & 2 != 0 { 'w' } else { '-' },
                    if bits & 1 != 0 { 'x' } else { '-' },
                )
            })
            .collect());
    }

    let mut perms: Vec<char> = current.chars().collect();
    if perms.len() != 9 {
        perms = "---------".chars().collect();
    }
    for clause in mode.split(',') {
        let op_at = clause.find(['+', '-', '=']).ok_or_else(invalid)?;
        let (who, rest) = clause.split_at(op_at);
        let op = rest.chars().next().ok_or_else(invalid)?;
        let what = &rest[1..];
        let classes: Vec<usize> = if who.is_empty() || who.contains('a') {
            vec![0, 1, 2]
        } else {
            who.chars()
                .map(|c| match c {
                    'u' => Ok(0),
                    'g' => Ok(1),
                    'o' => Ok(2),
                    _ => Err(invalid()),
                })
                .collect::<Result<_>>()?
        };
        for class in classes {
            for (slot, flag) in ['r', 'w', 'x'].into_iter().enumerate() {
                let idx = class * 3 + slot;
                let named = what.contains(flag);
                match op {
                    '+' if named => perms[idx] = flag,
                    '-' if named => perms[idx] = '-',
                    '=' => perms[idx] = if named { flag } else { '-' },
                    _ => {},
                }
            }
        }
        if what.chars().any(|c| !matches!(c, 'r' | 'w' | 'x')) {
            return Err(invalid());
        }
    }
    Ok(perms.into_iter().collect())
}

struct ChmodCmd;
impl Command for ChmodCmd {
    fn name(&self) -> &str {
        "chmod"
    }
    fn description(&self) -> &str {
        "Change file permissions"
    }
    fn usage(&self) -> &str {
        "chmod <mode> <path...>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let Some((&mode, paths)) = args.split_first() else {
            return Err(DevtermError::usage(self.usage()));
        };
        if paths.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        for p in paths {
            let path = state.resolve(p);
            let entry = lookup(&state.vfs, &path)?;
            let perms = apply_mode(&entry.permissions, mode)?;
            state.vfs.set_permissions(&path, &perms);
        }
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// ln
// ---------------------------------------------------------------------------

struct LnCmd;
impl Command for LnCmd {
    fn name(&self) -> &str {
        "ln"
    }
    fn description(&self) -> &str {
        "Create symbolic links"
    }
    fn usage(&self) -> &str {
        "ln -s <target> <link>"
    }
    fn category(&self) -> Category {
        Category::File
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let paths = positional(args);
        let [target, link] = paths[..] else {
            return Err(DevtermError::usage(self.usage()));
        };
        if !has_flag(args, 's', "symbolic") {
            return Err(DevtermError::Command(
                "ln: hard links are not supported; use ln -s".to_string(),
            ));
        }
        let link = destination(&state.vfs, target, &state.resolve(link));
        state.vfs.create(&link, EntryKind::Symlink, Some(target))?;
        Ok(CommandOutput::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "/home/developer/project";

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
    fn ls_lists_project() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "ls").unwrap());
        assert_eq!(out, "README.md  package.json  src/  tests/");
        let all = text(exec(&reg, &mut st, "ls -a").unwrap());
        assert!(all.contains(".gitignore"));
    }

    #[test]
    fn ls_aliases_resolve() {
        let (reg, mut st) = setup();
        let plain = text(exec(&reg, &mut st, "ls").unwrap());
        for alias in ["dir", "list", "LL"] {
            assert_eq!(text(exec(&reg, &mut st, alias).unwrap()), plain);
        }
    }

    #[test]
    fn ls_long_format() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "ls -l src").unwrap());
        assert!(out.starts_with("total "));
        assert!(out.contains("-rw-r--r--"));
        assert!(out.contains("index.js"));
    }

    #[test]
    fn ls_missing_path_errors() {
        let (reg, mut st) = setup();
        assert!(matches!(exec(&reg, &mut st, "ls nope"), Err(DevtermError::Vfs(_))));
    }

    #[test]
    fn cd_and_pwd() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "cd src").unwrap();
        assert_eq!(text(exec(&reg, &mut st, "pwd").unwrap()), format!("{PROJECT}/src"));
        assert_eq!(st.environment["PWD"], format!("{PROJECT}/src"));
        assert_eq!(text(exec(&reg, &mut st, "cd -").unwrap()), PROJECT);
        exec(&reg, &mut st, "cd").unwrap();
        assert_eq!(st.cwd, "/home/developer");
        assert!(exec(&reg, &mut st, "cd nowhere").is_err());
        assert!(exec(&reg, &mut st, "cd project/README.md").is_err());
    }

    #[test]
    fn cat_and_type() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "cat src/utils.js").unwrap());
        assert!(out.starts_with("export function greet"));
        assert_eq!(text(exec(&reg, &mut st, "type src/utils.js").unwrap()), out);
        assert!(matches!(exec(&reg, &mut st, "cat"), Err(DevtermError::Usage(_))));
        assert!(exec(&reg, &mut st, "cat src").is_err());
    }

    #[test]
    fn touch_mkdir_rm() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "mkdir -p a/b/c").unwrap();
        exec(&reg, &mut st, "touch a/b/c/x.txt").unwrap();
        assert!(st.vfs.exists(&format!("{PROJECT}/a/b/c/x.txt")));
        assert!(exec(&reg, &mut st, "rm a").is_err());
        exec(&reg, &mut st, "rm -rf a").unwrap();
        assert!(!st.vfs.exists(&format!("{PROJECT}/a/b/c/x.txt")));
        assert!(!st.vfs.exists(&format!("{PROJECT}/a")));
        assert!(exec(&reg, &mut st, "rm missing.txt").is_err());
        exec(&reg, &mut st, "rm -f missing.txt").unwrap();
    }

    #[test]
    fn md_and_del_aliases() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "md docs").unwrap();
        exec(&reg, &mut st, "touch docs/a.md").unwrap();
        exec(&reg, &mut st, "del docs/a.md").unwrap();
        assert!(!st.vfs.exists(&format!("{PROJECT}/docs/a.md")));
    }

    #[test]
    fn rmdir_requires_empty() {
        let (reg, mut st) = setup();
        assert!(exec(&reg, &mut st, "rmdir src").is_err());
        exec(&reg, &mut st, "mkdir empty").unwrap();
        exec(&reg, &mut st, "rmdir empty").unwrap();
        assert!(!st.vfs.exists(&format!("{PROJECT}/empty")));
    }

    #[test]
    fn cp_file_and_tree() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "cp README.md README.bak").unwrap();
        assert_eq!(
            st.vfs.read_to_string(&format!("{PROJECT}/README.bak")).unwrap(),
            st.vfs.read_to_string(&format!("{PROJECT}/README.md")).unwrap()
        );
        assert!(exec(&reg, &mut st, "cp src lib").is_err());
        exec(&reg, &mut st, "cp -r src lib").unwrap();
        assert!(st.vfs.exists(&format!("{PROJECT}/lib/utils.js")));
        exec(&reg, &mut st, "cp README.md tests").unwrap();
        assert!(st.vfs.exists(&format!("{PROJECT}/tests/README.md")));
        assert!(exec(&reg, &mut st, "cp -r src src/inner").is_err());
    }

    #[test]
    fn mv_renames_and_moves_into_dir() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "mv README.md README.txt").unwrap();
        assert!(st.vfs.exists(&format!("{PROJECT}/README.txt")));
        exec(&reg, &mut st, "mv README.txt src").unwrap();
        assert!(st.vfs.exists(&format!("{PROJECT}/src/README.txt")));
        assert!(exec(&reg, &mut st, "mv nope x").is_err());
        assert!(matches!(exec(&reg, &mut st, "mv one"), Err(DevtermError::Usage(_))));
    }

    #[test]
    fn write_and_append() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "write notes.txt hello world").unwrap());
        assert_eq!(out, format!("Wrote 12 bytes to {PROJECT}/notes.txt"));
        exec(&reg, &mut st, "write -a notes.txt again").unwrap();
        assert_eq!(
            st.vfs.read_to_string(&format!("{PROJECT}/notes.txt")).unwrap(),
            "hello world\nagain\n"
        );
    }

    #[test]
    fn tree_counts() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "tree").unwrap());
        assert!(out.contains("├── README.md"));
        assert!(out.ends_with("2 directories, 6 files"));
        let shallow = text(exec(&reg, &mut st, "tree -L 1").unwrap());
        assert!(!shallow.contains("index.js"));
    }

    #[test]
    fn find_by_glob_and_type() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "find . -name *.js").unwrap());
        assert!(out.contains("src/index.js"));
        assert!(out.contains("tests/index.test.js"));
        assert!(!out.contains("App.tsx"));
        let dirs = text(exec(&reg, &mut st, "find -type d").unwrap());
        assert!(dirs.contains("/src"));
        assert!(!dirs.contains("README"));
    }

    #[test]
    fn stat_reports_kind() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "stat src").unwrap());
        assert!(out.contains("Type: directory"));
        assert!(matches!(exec(&reg, &mut st, "stat"), Err(DevtermError::Usage(_))));
    }

    #[test]
    fn head_tail_wc() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "write nums.txt 1").unwrap();
        for n in 2..=15 {
            exec(&reg, &mut st, &format!("write -a nums.txt {n}")).unwrap();
        }
        assert_eq!(text(exec(&reg, &mut st, "head -n 2 nums.txt").unwrap()), "1\n2");
        assert_eq!(text(exec(&reg, &mut st, "tail -3 nums.txt").unwrap()), "13\n14\n15");
        assert_eq!(text(exec(&reg, &mut st, "head nums.txt").unwrap()).lines().count(), 10);
        assert_eq!(text(exec(&reg, &mut st, "wc -l nums.txt").unwrap()), "15 nums.txt");
        assert!(exec(&reg, &mut st, "head -n x nums.txt").is_err());
    }

    #[test]
    fn line_count_forms() {
        let args = vec!["-n5".to_string(), "log.txt".to_string()];
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        assert_eq!(line_count(&refs).unwrap(), (5, Some("log.txt")));
        assert_eq!(line_count(&["-n", "3"]).unwrap(), (3, None));
        assert_eq!(line_count(&["-7", "a"]).unwrap(), (7, Some("a")));
        assert!(line_count(&["-n"]).is_err());
    }

    #[test]
    fn grep_regex_and_flags() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "grep -n export src/utils.js").unwrap());
        assert_eq!(out, "1:export function greet(name) {\n5:export const sum = (a, b) => a + b;");
        assert_eq!(text(exec(&reg, &mut st, "grep -c -i EXPORT src/utils.js").unwrap()), "2");
        let rec = text(exec(&reg, &mut st, "grep -r greet src").unwrap());
        assert!(rec.contains("src/index.js:"));
        assert!(exec(&reg, &mut st, "grep greet src").is_err());
        assert!(matches!(exec(&reg, &mut st, "grep ( README.md"), Err(DevtermError::Regex(_))));
    }

    #[test]
    fn chmod_modes() {
        assert_eq!(apply_mode("rw-r--r--", "755").unwrap(), "rwxr-xr-x");
        assert_eq!(apply_mode("rw-r--r--", "+x").unwrap(), "rwxr-xr-x");
        assert_eq!(apply_mode("rwxrwxrwx", "go-w").unwrap(), "rwxr-xr-x");
        assert_eq!(apply_mode("rwxrwxrwx", "o=r").unwrap(), "rwxrwxr--");
        assert!(apply_mode("rw-r--r--", "z+q").is_err());
        assert!(apply_mode("rw-r--r--", "999").is_err());

        let (reg, mut st) = setup();
        exec(&reg, &mut st, "chmod 700 README.md").unwrap();
        assert_eq!(st.vfs.peek(&format!("{PROJECT}/README.md")).unwrap().permissions, "rwx------");
    }

    #[test]
    fn ln_symlink_reads_through() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "ln -s src/utils.js u.js").unwrap();
        let out = text(exec(&reg, &mut st, "cat u.js").unwrap());
        assert!(out.contains("greet"));
        assert!(text(exec(&reg, &mut st, "ls -l u.js").unwrap()).contains("u.js -> src/utils.js"));
        assert!(exec(&reg, &mut st, "ln a b").is_err());
    }

    #[test]
    fn glob() {
        assert!(glob_match("*.js", "index.js"));
        assert!(glob_match("i?dex.*", "index.js"));
        assert!(!glob_match("*.js", "App.tsx"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "axxbyyc"));
    }
}
