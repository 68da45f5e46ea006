//! In-memory VFS implementation.
//!
//! The entire tree lives in a `HashMap<String, VirtualEntry>` keyed by
//! normalized absolute path. Directories keep the paths of their direct
//! children in `child_paths`, so listing never scans the map.

use std::collections::HashMap;

use devterm_types::error::{DevtermError, Result};
use devterm_types::time::{new_id, now_ms};

use crate::entry::{EntryKind, VirtualEntry};
use crate::path::{file_name, normalize, parent};

/// Maximum symlink hops followed when reading.
const MAX_LINK_DEPTH: usize = 8;

/// A fully in-memory virtual file system.
#[derive(Debug, Clone)]
pub struct MemoryVfs {
    entries: HashMap<String, VirtualEntry>,
    owner: String,
    group: String,
}

impl MemoryVfs {
    /// Create a VFS with only the root directory, owned by `root`.
    pub fn new() -> Self {
        Self::with_owner("root", "root")
    }

    /// Create a VFS whose new entries default to the given owner and group.
    pub fn with_owner(owner: &str, group: &str) -> Self {
        let mut vfs = Self {
            entries: HashMap::new(),
            owner: owner.to_string(),
            group: group.to_string(),
        };
        let mut root = vfs.make_entry("/", EntryKind::Directory, None);
        root.owner = "root".to_string();
        root.group = "root".to_string();
        vfs.entries.insert("/".to_string(), root);
        vfs
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of entries, including the root.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(normalize(path).as_ref())
    }

    /// Borrow an entry without refreshing `accessed_at`.
    pub fn peek(&self, path: &str) -> Option<&VirtualEntry> {
        self.entries.get(normalize(path).as_ref())
    }

    /// Fetch an entry, refreshing its `accessed_at`.
    pub fn get(&mut self, path: &str) -> Option<VirtualEntry> {
        let entry = self.entries.get_mut(normalize(path).as_ref())?;
        entry.accessed_at = now_ms();
        Some(entry.clone())
    }

    /// Read a file's text, following symlinks.
    pub fn read_to_string(&mut self, path: &str) -> Result<String> {
        let mut current = normalize(path).into_owned();
        for _ in 0..MAX_LINK_DEPTH {
            let entry = self
                .get(&current)
                .ok_or_else(|| DevtermError::Vfs(format!("no such file: {current}")))?;
            match entry.kind {
                EntryKind::File => return Ok(entry.content.unwrap_or_default()),
                EntryKind::Directory => {
                    return Err(DevtermError::Vfs(format!("is a directory: {current}")));
                },
                EntryKind::Symlink => {
                    let target = entry.content.unwrap_or_default();
                    current = crate::path::resolve_path(parent(&current), "/", &target);
                },
            }
        }
        Err(DevtermError::Vfs(format!(
            "too many levels of symbolic links: {path}"
        )))
    }

    /// Create an entry. The parent must be an existing directory and the path
    /// must be free.
    pub fn create(
        &mut self,
        path: &str,
        kind: EntryKind,
        content: Option<&str>,
    ) -> Result<VirtualEntry> {
        let path = normalize(path).into_owned();
        if self.entries.contains_key(&path) {
            return Err(DevtermError::Vfs(format!("already exists: {path}")));
        }
        let par = parent(&path).to_string();
        match self.entries.get(&par) {
            Some(p) if p.is_dir() => {},
            Some(_) => return Err(DevtermError::Vfs(format!("not a directory: {par}"))),
            None => {
                return Err(DevtermError::Vfs(format!(
                    "parent directory does not exist: {par}"
                )));
            },
        }
        let entry = self.make_entry(&path, kind, content);
        self.entries.insert(path.clone(), entry.clone());
        self.attach(&par, &path);
        Ok(entry)
    }

    /// Create a directory and any missing ancestors. Existing directories
    /// are left alone.
    pub fn mkdir_all(&mut self, path: &str) -> Result<()> {
        let path = normalize(path).into_owned();
        match self.entries.get(&path) {
            Some(e) if e.is_dir() => return Ok(()),
            Some(_) => return Err(DevtermError::Vfs(format!("not a directory: {path}"))),
            None => {},
        }
        let par = parent(&path).to_string();
        if !self.entries.contains_key(&par) {
            self.mkdir_all(&par)?;
        }
        self.create(&path, EntryKind::Directory, None)?;
        Ok(())
    }

    /// Write file content, creating the file if needed.
    pub fn write(&mut self, path: &str, content: &str) -> Result<()> {
        let path = normalize(path);
        match self.entries.get(path.as_ref()).map(|e| e.kind) {
            Some(EntryKind::File) => {
                self.update(&path, content);
                Ok(())
            },
            Some(_) => Err(DevtermError::Vfs(format!("not a regular file: {path}"))),
            None => self
                .create(&path, EntryKind::File, Some(content))
                .map(|_| ()),
        }
    }

    /// Replace a file's content. Returns false for missing paths and
    /// non-files.
    pub fn update(&mut self, path: &str, content: &str) -> bool {
        match self.entries.get_mut(normalize(path).as_ref()) {
            Some(entry) if entry.is_file() => {
                entry.size = content.len() as u64;
                entry.content = Some(content.to_string());
                entry.modified_at = now_ms();
                true
            },
            _ => false,
        }
    }

    /// Refresh an entry's modification time.
    pub fn touch(&mut self, path: &str) -> bool {
        match self.entries.get_mut(normalize(path).as_ref()) {
            Some(entry) => {
                let now = now_ms();
                entry.modified_at = now;
                entry.accessed_at = now;
                true
            },
            None => false,
        }
    }

    /// Remove one entry. Shallow: a directory's children stay in the map, so
    /// callers that want recursion must delete descendants first. The root
    /// cannot be deleted.
    pub fn delete(&mut self, path: &str) -> bool {
        let path = normalize(path).into_owned();
        if path == "/" || self.entries.remove(&path).is_none() {
            return false;
        }
        let par = parent(&path).to_string();
        if let Some(dir) = self.entries.get_mut(&par) {
            if let Some(children) = dir.child_paths.as_mut() {
                children.retain(|c| c != &path);
            }
            dir.modified_at = now_ms();
        }
        true
    }

    /// List a directory's direct children sorted by name.
    pub fn list(&mut self, dir: &str) -> Result<Vec<VirtualEntry>> {
        let dir = normalize(dir).into_owned();
        let children = match self.entries.get_mut(&dir) {
            Some(entry) if entry.is_dir() => {
                entry.accessed_at = now_ms();
                entry.child_paths.clone().unwrap_or_default()
            },
            Some(_) => return Err(DevtermError::Vfs(format!("not a directory: {dir}"))),
            None => return Err(DevtermError::Vfs(format!("no such directory: {dir}"))),
        };
        let mut listed: Vec<VirtualEntry> = children
            .iter()
            .filter_map(|c| self.entries.get(c).cloned())
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    /// Move an entry (and, for directories, everything below it).
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from).into_owned();
        let to = normalize(to).into_owned();
        if from == "/" {
            return Err(DevtermError::Vfs("cannot move root".to_string()));
        }
        if !self.entries.contains_key(&from) {
            return Err(DevtermError::Vfs(format!("no such path: {from}")));
        }
        if self.entries.contains_key(&to) {
            return Err(DevtermError::Vfs(format!("already exists: {to}")));
        }
        if to.starts_with(&format!("{from}/")) {
            return Err(DevtermError::Vfs(format!(
                "cannot move {from} into itself"
            )));
        }
        let new_parent = parent(&to).to_string();
        if !self.entries.get(&new_parent).is_some_and(VirtualEntry::is_dir) {
            return Err(DevtermError::Vfs(format!(
                "parent directory does not exist: {new_parent}"
            )));
        }

        let mut moved = vec![from.clone()];
        moved.extend(self.paths_with_prefix(&from));
        let now = now_ms();
        for old_key in moved {
            let Some(mut entry) = self.entries.remove(&old_key) else {
                continue;
            };
            let new_key = rebase(&old_key, &from, &to);
            entry.name = file_name(&new_key).to_string();
            entry.parent_path = Some(parent(&new_key).to_string());
            if let Some(children) = entry.child_paths.as_mut() {
                for child in children.iter_mut() {
                    *child = rebase(child, &from, &to);
                }
            }
            entry.modified_at = now;
            self.entries.insert(new_key, entry);
        }

        let old_parent = parent(&from).to_string();
        if let Some(dir) = self.entries.get_mut(&old_parent) {
            if let Some(children) = dir.child_paths.as_mut() {
                children.retain(|c| c != &from);
            }
            dir.modified_at = now;
        }
        self.attach(&new_parent, &to);
        Ok(())
    }

    /// Set the permission string (e.g. `rwxr-xr-x`).
    pub fn set_permissions(&mut self, path: &str, permissions: &str) -> bool {
        match self.entries.get_mut(normalize(path).as_ref()) {
            Some(entry) => {
                entry.permissions = permissions.to_string();
                entry.modified_at = now_ms();
                true
            },
            None => false,
        }
    }

    /// Change owner and, optionally, group.
    pub fn set_owner(&mut self, path: &str, owner: &str, group: Option<&str>) -> bool {
        match self.entries.get_mut(normalize(path).as_ref()) {
            Some(entry) => {
                entry.owner = owner.to_string();
                if let Some(group) = group {
                    entry.group = group.to_string();
                }
                entry.modified_at = now_ms();
                true
            },
            None => false,
        }
    }

    /// All paths strictly below `dir`, sorted.
    pub fn paths_with_prefix(&self, dir: &str) -> Vec<String> {
        let dir = normalize(dir);
        let prefix = if dir.as_ref() == "/" {
            "/".to_string()
        } else {
            format!("{dir}/")
        };
        let mut paths: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.len() > prefix.len() && k.starts_with(&prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Iterate over every `(path, entry)` pair in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VirtualEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn make_entry(&self, path: &str, kind: EntryKind, content: Option<&str>) -> VirtualEntry {
        let now = now_ms();
        let content = match kind {
            EntryKind::Directory => None,
            _ => Some(content.unwrap_or_default().to_string()),
        };
        VirtualEntry {
            id: new_id(),
            name: file_name(path).to_string(),
            kind,
            size: content.as_ref().map_or(0, |c| c.len() as u64),
            content,
            permissions: kind.default_permissions().to_string(),
            owner: self.owner.clone(),
            group: self.group.clone(),
            created_at: now,
            modified_at: now,
            accessed_at: now,
            parent_path: (path != "/").then(|| parent(path).to_string()),
            child_paths: (kind == EntryKind::Directory).then(Vec::new),
        }
    }

    fn attach(&mut self, dir: &str, child: &str) {
        if let Some(entry) = self.entries.get_mut(dir) {
            let children = entry.child_paths.get_or_insert_with(Vec::new);
            if !children.iter().any(|c| c == child) {
                children.push(child.to_string());
            }
            entry.modified_at = now_ms();
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the `from` prefix of `path` with `to`.
fn rebase(path: &str, from: &str, to: &str) -> String {
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}
