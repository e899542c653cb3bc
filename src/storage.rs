use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Error;

/// Client-side key-value persistence (the browser local storage equivalent).
///
/// Values are opaque strings. Reads never fail: a backend that cannot read a
/// key reports it as absent.
///
/// # Example
///
/// ```rust,ignore
/// impl KeyValueStore for Keychain {
///     fn get(&self, key: &str) -> Option<String> {
///         self.entry(key).ok()?.get_password().ok()
///     }
///
///     fn set(&self, key: &str, value: String) -> Result<(), Error> {
///         self.entry(key)?.set_password(&value).map_err(|e| Error::Storage(e.to_string()))
///     }
///
///     fn remove(&self, key: &str) -> Result<(), Error> {
///         self.entry(key)?.delete_password().map_err(|e| Error::Storage(e.to_string()))
///     }
/// }
/// ```
pub trait KeyValueStore: Send + Sync + 'static {
    /// Look up a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: String) -> Result<(), Error>;

    /// Remove a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// In-process storage. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Storage persisted as a single JSON object file.
///
/// The file is read once at [`open`](FileStore::open) and rewritten after
/// every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file exists but cannot be read or
    /// does not hold a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    // Memory is only updated once the file write succeeded.
    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        let mut entries = self.entries.write();
        let mut updated = entries.clone();
        updated.insert(key.to_owned(), value);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}
