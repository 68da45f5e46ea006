//! Virtual file system for devterm.
//!
//! The VFS is a flat map from normalized absolute paths to [`VirtualEntry`]
//! records. Nothing here touches the real disk.

mod entry;
mod memory;
mod path;
mod scaffold;

pub use entry::{EntryKind, VirtualEntry};
pub use memory::MemoryVfs;
pub use path::{file_name, normalize, parent, resolve_path};
