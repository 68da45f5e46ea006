use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of VFS entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// Default permission string for newly created entries.
    pub fn default_permissions(self) -> &'static str {
        match self {
            Self::File => "rw-r--r--",
            Self::Directory => "rwxr-xr-x",
            Self::Symlink => "rwxrwxrwx",
        }
    }

    /// Leading character of an `ls -l` mode column.
    pub fn type_char(self) -> char {
        match self {
            Self::File => '-',
            Self::Directory => 'd',
            Self::Symlink => 'l',
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        })
    }
}

/// One file, directory or symlink in the VFS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    /// File text, or the target path for symlinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub size: u64,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub accessed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    /// Absolute paths of direct children (directories only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_paths: Option<Vec<String>>,
}

impl VirtualEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// `ls -l` style mode, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        format!("{}{}", self.kind.type_char(), self.permissions)
    }

    /// Number of direct children (0 for non-directories).
    pub fn child_count(&self) -> usize {
        self.child_paths.as_ref().map_or(0, Vec::len)
    }
}
