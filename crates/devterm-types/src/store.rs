//! Persistence port.
//!
//! Stateful services (history, sessions) never touch storage directly. They
//! hold a [`Store`] and read/write whole values through it, so the host can
//! back them with memory, a JSON file, or anything else that can load and
//! save a value.

use std::cell::RefCell;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DevtermError, Result};

/// Load/save a whole value of type `T`.
pub trait Store<T> {
    /// Load the stored value. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<T>>;

    /// Replace the stored value.
    fn save(&mut self, value: &T) -> Result<()>;
}

/// In-memory store.
///
/// Clones share the same slot, so a caller can keep a handle and observe what
/// a service wrote through its own copy.
#[derive(Debug)]
pub struct MemoryStore<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// Create a store that already holds `value`.
    pub fn with_value(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(value))),
        }
    }
}

impl<T: Clone> MemoryStore<T> {
    /// Current contents.
    pub fn snapshot(&self) -> Option<T> {
        self.slot.borrow().clone()
    }
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Store<T> for MemoryStore<T> {
    fn load(&self) -> Result<Option<T>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, value: &T) -> Result<()> {
        *self.slot.borrow_mut() = Some(value.clone());
        Ok(())
    }
}

/// Store that keeps the value as pretty-printed JSON in one file.
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize + DeserializeOwned> Store<T> for JsonFileStore<T> {
    fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text).map(Some).map_err(|e| {
            DevtermError::Persistence(format!("{}: {e}", self.path.display()))
        })
    }

    fn save(&mut self, value: &T) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
