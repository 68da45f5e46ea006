//! Simulated git repository over the VFS.
//!
//! A repository tracks snapshots of the files below its root. Trees are maps
//! from root-relative paths to file content. The working tree is read from
//! the VFS on demand, so edits made by any command show up in `status`.

use std::collections::BTreeMap;

use devterm_types::error::{DevtermError, Result};
use devterm_types::time::{new_id, now_ms};
use devterm_vfs::{EntryKind, MemoryVfs, parent};

pub const DEFAULT_BRANCH: &str = "main";
const GIT_DIR: &str = ".git";

pub type Tree = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub author: String,
    pub timestamp: i64,
    pub parent: Option<String>,
    pub branch: String,
    /// Paths changed by this commit.
    pub files: Vec<String>,
}

/// How a path differs between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Modified,
    Deleted,
}

impl Change {
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "new file",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub staged: Vec<(Change, String)>,
    pub unstaged: Vec<(Change, String)>,
    pub untracked: Vec<String>,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StashEntry {
    pub message: String,
    /// Working-tree changes relative to HEAD; `None` means deleted.
    changes: BTreeMap<String, Option<String>>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    UpToDate,
    Pushed { from: Option<String>, to: String },
}

#[derive(Debug, Clone)]
pub struct Repository {
    root: String,
    branch: String,
    /// Branch name to head commit.
    branches: BTreeMap<String, Option<String>>,
    commits: BTreeMap<String, Commit>,
    snapshots: BTreeMap<String, Tree>,
    /// Staged content; `None` stages a deletion.
    index: BTreeMap<String, Option<String>>,
    remotes: BTreeMap<String, String>,
    /// Last pushed head per branch.
    pushed: BTreeMap<String, String>,
    stash: Vec<StashEntry>,
}

impl Repository {
    /// `git init`: create `.git` below `root` and start on `main`.
    pub fn init(root: &str, vfs: &mut MemoryVfs) -> Result<Self> {
        let git_dir = join(root, GIT_DIR);
        vfs.mkdir_all(&git_dir)?;
        vfs.write(
            &join(&git_dir, "HEAD"),
            &format!("ref: refs/heads/{DEFAULT_BRANCH}\n"),
        )?;
        let mut branches = BTreeMap::new();
        branches.insert(DEFAULT_BRANCH.to_string(), None);
        Ok(Self {
            root: root.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            branches,
            commits: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            index: BTreeMap::new(),
            remotes: BTreeMap::new(),
            pushed: BTreeMap::new(),
            stash: Vec::new(),
        })
    }

    /// `git clone`: a repository at `root` holding one commit with a README,
    /// with `origin` pointing at `url`.
    pub fn clone_from(url: &str, root: &str, vfs: &mut MemoryVfs, author: &str) -> Result<Self> {
        if vfs.exists(root) {
            return Err(DevtermError::Command(format!(
                "destination path '{root}' already exists"
            )));
        }
        vfs.mkdir_all(root)?;
        let name = repo_name_from_url(url);
        vfs.write(
            &join(root, "README.md"),
            &format!("# {name}\n\nCloned from {url}\n"),
        )?;
        let mut repo = Self::init(root, vfs)?;
        repo.add_all(vfs);
        let head = repo.commit("Initial commit", author)?;
        repo.remotes.insert("origin".to_string(), url.to_string());
        repo.pushed.insert(repo.branch.clone(), head.id);
        Ok(repo)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    pub fn remotes(&self) -> &BTreeMap<String, String> {
        &self.remotes
    }

    pub fn head(&self) -> Option<&Commit> {
        self.branches
            .get(&self.branch)
            .and_then(|id| id.as_ref())
            .and_then(|id| self.commits.get(id))
    }

    fn head_tree(&self) -> Tree {
        self.head()
            .and_then(|c| self.snapshots.get(&c.id))
            .cloned()
            .unwrap_or_default()
    }

    /// Files below the root that are neither in `.git` nor ignored.
    pub fn working_tree(&self, vfs: &MemoryVfs) -> Tree {
        let ignore = self.ignore_patterns(vfs);
        vfs.paths_with_prefix(&self.root)
            .into_iter()
            .filter_map(|abs| {
                let entry = vfs.peek(&abs)?;
                if entry.kind != EntryKind::File {
                    return None;
                }
                let rel = self.relative(&abs)?;
                if rel == GIT_DIR || rel.starts_with(".git/") || is_ignored(&rel, &ignore) {
                    return None;
                }
                Some((rel, entry.content.clone().unwrap_or_default()))
            })
            .collect()
    }

    fn ignore_patterns(&self, vfs: &MemoryVfs) -> Vec<String> {
        vfs.peek(&join(&self.root, ".gitignore"))
            .and_then(|e| e.content.as_deref())
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Root-relative form of an absolute path, if it lies inside the root.
    pub fn relative(&self, abs: &str) -> Option<String> {
        if abs == self.root {
            return Some(String::new());
        }
        let prefix = if self.root == "/" {
            "/".to_string()
        } else {
            format!("{}/", self.root)
        };
        abs.strip_prefix(&prefix).map(String::from)
    }

    pub fn status(&self, vfs: &MemoryVfs) -> Status {
        let head = self.head_tree();
        let work = self.working_tree(vfs);
        let mut status = Status::default();

        for (path, staged) in &self.index {
            let change = match (head.get(path), staged) {
                (_, None) => Change::Deleted,
                (None, Some(_)) => Change::Added,
                (Some(_), Some(_)) => Change::Modified,
            };
            status.staged.push((change, path.clone()));
        }

        for (path, content) in &work {
            let expected = match self.index.get(path) {
                Some(staged) => staged.as_ref(),
                None => head.get(path),
            };
            match expected {
                Some(exp) if exp != content => status.unstaged.push((Change::Modified, path.clone())),
                Some(_) => {},
                None if self.index.contains_key(path) => {
                    status.unstaged.push((Change::Added, path.clone()));
                },
                None => status.untracked.push(path.clone()),
            }
        }
        for path in head.keys() {
            if !work.contains_key(path) && !self.index.contains_key(path) {
                status.unstaged.push((Change::Deleted, path.clone()));
            }
        }
        status.unstaged.sort_by(|a, b| a.1.cmp(&b.1));
        status
    }

    /// Stage every change below the root. Returns the number of paths staged.
    pub fn add_all(&mut self, vfs: &MemoryVfs) -> usize {
        let root = self.root.clone();
        self.add_below(&root, vfs)
    }

    /// Stage one path (file or directory, absolute).
    pub fn add(&mut self, abs: &str, vfs: &MemoryVfs) -> Result<usize> {
        let Some(rel) = self.relative(abs) else {
            return Err(DevtermError::Command(format!(
                "'{abs}' is outside repository at '{}'",
                self.root
            )));
        };
        match vfs.peek(abs) {
            Some(e) if e.is_dir() => Ok(self.add_below(abs, vfs)),
            Some(_) => {
                let work = self.working_tree(vfs);
                match work.get(&rel) {
                    Some(content) => {
                        self.stage(&rel, Some(content.clone()));
                        Ok(1)
                    },
                    None => Err(DevtermError::Command(format!(
                        "the following path is ignored: {rel}"
                    ))),
                }
            },
            None if self.head_tree().contains_key(&rel) => {
                self.stage(&rel, None);
                Ok(1)
            },
            None => Err(DevtermError::Command(format!(
                "pathspec '{rel}' did not match any files"
            ))),
        }
    }

    /// Stage modifications and deletions of tracked files only
    /// (`commit -a`).
    pub fn add_tracked(&mut self, vfs: &MemoryVfs) -> usize {
        let head = self.head_tree();
        let work = self.working_tree(vfs);
        let mut staged = 0;
        for (path, committed) in &head {
            match work.get(path) {
                Some(content) if content != committed => {
                    self.stage(path, Some(content.clone()));
                    staged += 1;
                },
                Some(_) => {},
                None => {
                    self.stage(path, None);
                    staged += 1;
                },
            }
        }
        staged
    }

    fn add_below(&mut self, abs_dir: &str, vfs: &MemoryVfs) -> usize {
        let prefix = match self.relative(abs_dir) {
            Some(p) if p.is_empty() => String::new(),
            Some(p) => format!("{p}/"),
            None => return 0,
        };
        let head = self.head_tree();
        let work = self.working_tree(vfs);
        let mut staged = 0;
        for (path, content) in work.iter().filter(|(p, _)| p.starts_with(&prefix)) {
            if head.get(path) != Some(content) || self.index.contains_key(path) {
                self.stage(path, Some(content.clone()));
                staged += 1;
            }
        }
        for path in head.keys().filter(|p| p.starts_with(&prefix)) {
            if !work.contains_key(path) {
                self.stage(path, None);
                staged += 1;
            }
        }
        staged
    }

    fn stage(&mut self, rel: &str, content: Option<String>) {
        let head = self.head_tree();
        if head.get(rel) == content.as_ref() {
            self.index.remove(rel);
        } else {
            self.index.insert(rel.to_string(), content);
        }
    }

    /// Unstage a path (`git reset <path>`).
    pub fn unstage(&mut self, rel: &str) -> bool {
        self.index.remove(rel).is_some()
    }

    pub fn commit(&mut self, message: &str, author: &str) -> Result<Commit> {
        if self.index.is_empty() {
            return Err(DevtermError::Command(
                "nothing to commit (use \"git add\" to track files)".to_string(),
            ));
        }
        let mut tree = self.head_tree();
        let files: Vec<String> = self.index.keys().cloned().collect();
        for (path, content) in std::mem::take(&mut self.index) {
            match content {
                Some(c) => {
                    tree.insert(path, c);
                },
                None => {
                    tree.remove(&path);
                },
            }
        }
        let commit = Commit {
            id: short_id(),
            message: message.to_string(),
            author: author.to_string(),
            timestamp: now_ms(),
            parent: self.head().map(|c| c.id.clone()),
            branch: self.branch.clone(),
            files,
        };
        self.snapshots.insert(commit.id.clone(), tree);
        self.commits.insert(commit.id.clone(), commit.clone());
        self.branches
            .insert(self.branch.clone(), Some(commit.id.clone()));
        log::debug!("commit {} on {}", commit.id, self.branch);
        Ok(commit)
    }

    /// Commits reachable from HEAD, newest first.
    pub fn log(&self) -> Vec<&Commit> {
        let mut out = Vec::new();
        let mut cursor = self.head();
        while let Some(c) = cursor {
            out.push(c);
            cursor = c.parent.as_ref().and_then(|p| self.commits.get(p));
        }
        out
    }

    pub fn create_branch(&mut self, name: &str) -> Result<()> {
        if self.branches.contains_key(name) {
            return Err(DevtermError::Command(format!(
                "a branch named '{name}' already exists"
            )));
        }
        let head = self.head().map(|c| c.id.clone());
        self.branches.insert(name.to_string(), head);
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> Result<()> {
        if name == self.branch {
            return Err(DevtermError::Command(format!(
                "cannot delete branch '{name}' checked out at '{}'",
                self.root
            )));
        }
        self.branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DevtermError::Command(format!("branch '{name}' not found")))
    }

    /// Switch branches, rewriting the working tree when the heads differ.
    pub fn checkout(&mut self, name: &str, vfs: &mut MemoryVfs) -> Result<()> {
        let Some(target) = self.branches.get(name).cloned() else {
            return Err(DevtermError::Command(format!(
                "pathspec '{name}' did not match any branch"
            )));
        };
        let current = self.head().map(|c| c.id.clone());
        if target != current {
            let status = self.status(vfs);
            if !status.staged.is_empty() || !status.unstaged.is_empty() {
                return Err(DevtermError::Command(
                    "your local changes would be overwritten by checkout; commit or stash them first"
                        .to_string(),
                ));
            }
            let old_tree = self.head_tree();
            let new_tree = target
                .as_ref()
                .and_then(|id| self.snapshots.get(id))
                .cloned()
                .unwrap_or_default();
            for path in old_tree.keys().filter(|p| !new_tree.contains_key(*p)) {
                vfs.delete(&join(&self.root, path));
            }
            for (path, content) in &new_tree {
                self.write_file(vfs, path, Some(content))?;
            }
        }
        self.branch = name.to_string();
        vfs.write(
            &join(&join(&self.root, GIT_DIR), "HEAD"),
            &format!("ref: refs/heads/{name}\n"),
        )?;
        Ok(())
    }

    /// Unified-style diff lines for changed files. `staged` compares the
    /// index against HEAD; otherwise the working tree against the index.
    pub fn diff(&self, vfs: &MemoryVfs, staged: bool) -> Vec<String> {
        let head = self.head_tree();
        let mut out = Vec::new();
        if staged {
            for (path, new) in &self.index {
                push_file_diff(&mut out, path, head.get(path), new.as_ref());
            }
        } else {
            let work = self.working_tree(vfs);
            let mut paths: Vec<&String> = head.keys().chain(self.index.keys()).collect();
            paths.sort();
            paths.dedup();
            for path in paths {
                let base = match self.index.get(path) {
                    Some(staged) => staged.as_ref(),
                    None => head.get(path),
                };
                let new = work.get(path);
                if base != new {
                    push_file_diff(&mut out, path, base, new);
                }
            }
        }
        out
    }

    /// Save uncommitted tracked changes and reset the working tree to HEAD.
    pub fn stash_push(&mut self, vfs: &mut MemoryVfs) -> Result<usize> {
        let head = self.head_tree();
        let work = self.working_tree(vfs);
        let mut changes = BTreeMap::new();
        for (path, content) in &work {
            let tracked = head.contains_key(path) || self.index.contains_key(path);
            if tracked && head.get(path) != Some(content) {
                changes.insert(path.clone(), Some(content.clone()));
            }
        }
        for path in head.keys().filter(|p| !work.contains_key(*p)) {
            changes.insert(path.clone(), None);
        }
        if changes.is_empty() {
            return Ok(0);
        }
        for path in changes.keys() {
            self.write_file(vfs, path, head.get(path))?;
        }
        self.index.clear();
        let message = format!(
            "WIP on {}: {}",
            self.branch,
            self.head().map_or("(no commits)".to_string(), |c| format!("{} {}", c.id, c.message))
        );
        let n = changes.len();
        self.stash.push(StashEntry { message, changes });
        Ok(n)
    }

    /// Re-apply the most recent stash.
    pub fn stash_pop(&mut self, vfs: &mut MemoryVfs) -> Result<usize> {
        let entry = self
            .stash
            .pop()
            .ok_or_else(|| DevtermError::Command("no stash entries found".to_string()))?;
        for (path, content) in &entry.changes {
            self.write_file(vfs, path, content.as_ref())?;
        }
        Ok(entry.changes.len())
    }

    pub fn stash_list(&self) -> impl DoubleEndedIterator<Item = &StashEntry> {
        self.stash.iter()
    }

    pub fn add_remote(&mut self, name: &str, url: &str) -> Result<()> {
        if self.remotes.contains_key(name) {
            return Err(DevtermError::Command(format!("remote {name} already exists")));
        }
        self.remotes.insert(name.to_string(), url.to_string());
        Ok(())
    }

    pub fn remove_remote(&mut self, name: &str) -> Result<()> {
        self.remotes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DevtermError::Command(format!("no such remote: '{name}'")))
    }

    pub fn push(&mut self, remote: &str) -> Result<PushOutcome> {
        if !self.remotes.contains_key(remote) {
            return Err(DevtermError::Command(format!(
                "'{remote}' does not appear to be a git repository"
            )));
        }
        let Some(head) = self.head().map(|c| c.id.clone()) else {
            return Err(DevtermError::Command(format!(
                "src refspec {} does not match any",
                self.branch
            )));
        };
        let previous = self.pushed.insert(self.branch.clone(), head.clone());
        if previous.as_deref() == Some(head.as_str()) {
            return Ok(PushOutcome::UpToDate);
        }
        Ok(PushOutcome::Pushed {
            from: previous,
            to: head,
        })
    }

    fn write_file(&self, vfs: &mut MemoryVfs, rel: &str, content: Option<&String>) -> Result<()> {
        let abs = join(&self.root, rel);
        match content {
            Some(c) => {
                vfs.mkdir_all(parent(&abs))?;
                vfs.write(&abs, c)
            },
            None => {
                vfs.delete(&abs);
                Ok(())
            },
        }
    }
}

fn join(dir: &str, rel: &str) -> String {
    if dir == "/" {
        format!("/{rel}")
    } else {
        format!("{dir}/{rel}")
    }
}

fn short_id() -> String {
    new_id().replace('-', "")[..7].to_string()
}

/// Last path segment of a clone URL without `.git`.
pub fn repo_name_from_url(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit(['/', ':']).next().unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// `.gitignore` matching: `dir/` matches a directory component, `*.ext`
/// matches a suffix, anything else matches a whole component or the full
/// relative path.
fn is_ignored(rel: &str, patterns: &[String]) -> bool {
    let components: Vec<&str> = rel.split('/').collect();
    patterns.iter().any(|pat| {
        let pat = pat.trim_start_matches('/');
        if let Some(dir) = pat.strip_suffix('/') {
            components[..components.len().saturating_sub(1)].contains(&dir)
        } else if let Some(ext) = pat.strip_prefix('*') {
            components.last().is_some_and(|name| name.ends_with(ext))
        } else {
            rel == pat || components.contains(&pat)
        }
    })
}

fn push_file_diff(out: &mut Vec<String>, path: &str, old: Option<&String>, new: Option<&String>) {
    out.push(format!("diff --git a/{path} b/{path}"));
    match (old, new) {
        (None, _) => out.push("new file".to_string()),
        (_, None) => out.push("deleted file".to_string()),
        _ => {},
    }
    out.push(format!("--- {}", old.map_or("/dev/null".to_string(), |_| format!("a/{path}"))));
    out.push(format!("+++ {}", new.map_or("/dev/null".to_string(), |_| format!("b/{path}"))));
    let old_lines: Vec<&str> = old.map_or(Vec::new(), |s| s.lines().collect());
    let new_lines: Vec<&str> = new.map_or(Vec::new(), |s| s.lines().collect());
    out.extend(line_diff(&old_lines, &new_lines));
}

/// LCS line diff. Context lines are prefixed with a space.
pub(crate) fn line_diff(old: &[&str], new: &[&str]) -> Vec<String> {
    let (n, m) = (old.len(), new.len());
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(format!(" {}", old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(format!("-{}", old[i]));
            i += 1;
        } else {
            out.push(format!("+{}", new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|l| format!("-{l}")));
    out.extend(new[j..].iter().map(|l| format!("+{l}")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/home/dev/project";

    fn setup() -> (MemoryVfs, Repository) {
        let mut vfs = MemoryVfs::with_scaffold("dev").unwrap();
        let repo = Repository::init(ROOT, &mut vfs).unwrap();
        (vfs, repo)
    }

    #[test]
    fn fresh_repo_reports_untracked() {
        let (vfs, repo) = setup();
        let status = repo.status(&vfs);
        assert!(status.staged.is_empty());
        assert!(status.untracked.contains(&"package.json".to_string()));
        assert!(status.untracked.contains(&"src/index.js".to_string()));
        assert!(status.untracked.contains(&".gitignore".to_string()));
        assert!(!status.untracked.iter().any(|p| p == ".git" || p.starts_with(".git/")));
    }

    #[test]
    fn add_commit_cleans_status() {
        let (vfs, mut repo) = setup();
        let staged = repo.add_all(&vfs);
        assert!(staged > 0);
        assert_eq!(repo.status(&vfs).staged.len(), staged);
        let c = repo.commit("init", "dev").unwrap();
        assert_eq!(c.id.len(), 7);
        assert!(repo.status(&vfs).is_clean());
        assert!(repo.commit("again", "dev").is_err());
    }

    #[test]
    fn modification_shows_unstaged() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        vfs.write(&format!("{ROOT}/README.md"), "changed\n").unwrap();
        let status = repo.status(&vfs);
        assert_eq!(status.unstaged, vec![(Change::Modified, "README.md".to_string())]);
        let diff = repo.diff(&vfs, false);
        assert!(diff.contains(&"+changed".to_string()));
    }

    #[test]
    fn ignored_paths_skipped() {
        let (mut vfs, repo) = setup();
        vfs.mkdir_all(&format!("{ROOT}/node_modules/react")).unwrap();
        vfs.write(&format!("{ROOT}/node_modules/react/index.js"), "x").unwrap();
        vfs.write(&format!("{ROOT}/.env"), "SECRET=1").unwrap();
        let status = repo.status(&vfs);
        assert!(!status.untracked.iter().any(|p| p.starts_with("node_modules")));
        assert!(!status.untracked.contains(&".env".to_string()));
    }

    #[test]
    fn deleted_file_can_be_staged() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        let readme = format!("{ROOT}/README.md");
        vfs.delete(&readme);
        assert_eq!(repo.add(&readme, &vfs).unwrap(), 1);
        assert_eq!(repo.status(&vfs).staged, vec![(Change::Deleted, "README.md".to_string())]);
    }

    #[test]
    fn add_tracked_skips_untracked() {
        let (mut vfs, mut repo) = setup();
        repo.add(&format!("{ROOT}/README.md"), &vfs).unwrap();
        repo.commit("readme", "dev").unwrap();
        vfs.write(&format!("{ROOT}/README.md"), "new").unwrap();
        assert_eq!(repo.add_tracked(&vfs), 1);
        let status = repo.status(&vfs);
        assert_eq!(status.staged, vec![(Change::Modified, "README.md".to_string())]);
        assert!(status.untracked.contains(&"package.json".to_string()));
    }

    #[test]
    fn add_unknown_path_errors() {
        let (vfs, mut repo) = setup();
        assert!(repo.add(&format!("{ROOT}/nope.txt"), &vfs).is_err());
    }

    #[test]
    fn log_newest_first() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("first", "dev").unwrap();
        vfs.write(&format!("{ROOT}/a.txt"), "a").unwrap();
        repo.add_all(&vfs);
        repo.commit("second", "dev").unwrap();
        let msgs: Vec<&str> = repo.log().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(msgs, ["second", "first"]);
    }

    #[test]
    fn checkout_rewrites_working_tree() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        repo.create_branch("feature").unwrap();
        repo.checkout("feature", &mut vfs).unwrap();
        vfs.write(&format!("{ROOT}/feature.txt"), "f").unwrap();
        repo.add_all(&vfs);
        repo.commit("feature work", "dev").unwrap();

        repo.checkout("main", &mut vfs).unwrap();
        assert!(!vfs.exists(&format!("{ROOT}/feature.txt")));
        repo.checkout("feature", &mut vfs).unwrap();
        assert!(vfs.exists(&format!("{ROOT}/feature.txt")));
        assert!(repo.checkout("nope", &mut vfs).is_err());
    }

    #[test]
    fn checkout_refuses_dirty_tree() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        repo.create_branch("other").unwrap();
        repo.checkout("other", &mut vfs).unwrap();
        vfs.write(&format!("{ROOT}/x.txt"), "x").unwrap();
        repo.add_all(&vfs);
        repo.commit("x", "dev").unwrap();
        vfs.write(&format!("{ROOT}/README.md"), "dirty").unwrap();
        assert!(repo.checkout("main", &mut vfs).is_err());
    }

    #[test]
    fn stash_round_trip() {
        let (mut vfs, mut repo) = setup();
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        let readme = format!("{ROOT}/README.md");
        let original = vfs.read_to_string(&readme).unwrap();
        vfs.write(&readme, "wip").unwrap();
        assert_eq!(repo.stash_push(&mut vfs).unwrap(), 1);
        assert_eq!(vfs.read_to_string(&readme).unwrap(), original);
        assert_eq!(repo.stash_list().count(), 1);
        repo.stash_pop(&mut vfs).unwrap();
        assert_eq!(vfs.read_to_string(&readme).unwrap(), "wip");
        assert!(repo.stash_pop(&mut vfs).is_err());
    }

    #[test]
    fn push_needs_remote_and_commits() {
        let (vfs, mut repo) = setup();
        assert!(repo.push("origin").is_err());
        repo.add_remote("origin", "https://example.com/app.git").unwrap();
        assert!(repo.push("origin").is_err());
        repo.add_all(&vfs);
        repo.commit("init", "dev").unwrap();
        assert!(matches!(repo.push("origin").unwrap(), PushOutcome::Pushed { from: None, .. }));
        assert_eq!(repo.push("origin").unwrap(), PushOutcome::UpToDate);
    }

    #[test]
    fn clone_creates_committed_repo() {
        let mut vfs = MemoryVfs::with_scaffold("dev").unwrap();
        let root = "/home/dev/tool";
        let repo = Repository::clone_from("https://github.com/acme/tool.git", root, &mut vfs, "dev")
            .unwrap();
        assert_eq!(repo.log().len(), 1);
        assert!(repo.status(&vfs).is_clean());
        assert_eq!(repo.remotes()["origin"], "https://github.com/acme/tool.git");
        assert!(Repository::clone_from("x", root, &mut vfs, "dev").is_err());
    }

    #[test]
    fn repo_names() {
        assert_eq!(repo_name_from_url("https://github.com/acme/tool.git"), "tool");
        assert_eq!(repo_name_from_url("git@github.com:acme/widget"), "widget");
    }

    #[test]
    fn diff_marks_lines() {
        let d = line_diff(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(d, [" a", "-b", "+x", " c"]);
    }
}
