//! Key-value persistence port and autosave state.

use crate::schedule::Debouncer;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage unavailable")]
    Unavailable,
    #[error("cannot encode design: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where saved designs live.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
    writes: Cell<usize>,
}

/// In-memory store. Clones share contents, so a test can keep a handle
/// after giving one to the editor.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`StorageError::QuotaExceeded`].
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.set(failing);
    }

    /// Successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.inner.writes.get()
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.data.borrow().get(key).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.inner.failing.get() {
            Err(StorageError::QuotaExceeded)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.peek(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner
            .data
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.inner.writes.set(self.inner.writes.get() + 1);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.data.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Autosave bookkeeping. The editor owns the store and does the writing.
#[derive(Debug, Clone, PartialEq)]
pub struct Autosave {
    pub enabled: bool,
    pub dirty: bool,
    pub last_saved_at: Option<u64>,
    pub timer: Debouncer,
}

impl Autosave {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            enabled: false,
            dirty: false,
            last_saved_at: None,
            timer: Debouncer::new(debounce_ms),
        }
    }

    pub fn mark_dirty(&mut self, now: u64) {
        self.dirty = true;
        self.timer.schedule(now);
    }

    pub fn mark_saved(&mut self, now: u64) {
        self.dirty = false;
        self.last_saved_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_shares_between_clones() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        handle.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.writes(), 1);
        handle.remove("k").unwrap();
        assert_eq!(store.peek("k"), None);
    }

    #[test]
    fn memory_store_failure_switch() {
        let mut store = MemoryStore::new();
        store.set_failing(true);
        assert!(matches!(store.set("k", "v"), Err(StorageError::QuotaExceeded)));
        store.set_failing(false);
        assert!(store.set("k", "v").is_ok());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("festoon_store_{}", std::process::id()));
        let mut store = FileStore::new(&dir);
        assert_eq!(store.get("design/1").unwrap(), None);
        store.set("design/1", "{}").unwrap();
        assert_eq!(store.get("design/1").unwrap().as_deref(), Some("{}"));
        store.remove("design/1").unwrap();
        store.remove("design/1").unwrap();
        assert_eq!(store.get("design/1").unwrap(), None);
        let _ = fs::remove_dir_all(dir);
    }
}
