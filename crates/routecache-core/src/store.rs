//! Namespaced key-value persistence.
//!
//! Every cache in this crate writes through a `KeyValueStore`. Values are
//! plain strings grouped into isolated namespaces (`login_cache`,
//! `company_cache`). Persistence is best-effort: a failed write is logged and
//! dropped, a missing or unreadable entry reads as `None`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Option<String>;
    fn set(&self, namespace: &str, key: &str, value: &str);
    fn remove(&self, namespace: &str, key: &str);
    fn clear(&self, namespace: &str);
}

impl dyn KeyValueStore {
    /// Read and decode a JSON value. Undecodable values read as `None`.
    pub fn get_json<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let raw = self.get(namespace, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(namespace, key, error = %e, "Stored value is not valid JSON for this type");
                None
            }
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.set(namespace, key, &json),
            Err(e) => warn!(namespace, key, error = %e, "Failed to serialize value for storage"),
        }
    }
}

/// A store handle bound to one namespace.
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn KeyValueStore>,
    name: &'static str,
}

impl Namespace {
    pub fn new(store: Arc<dyn KeyValueStore>, name: &'static str) -> Self {
        Self { store, name }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(self.name, key)
    }

    pub fn set(&self, key: &str, value: &str) {
        self.store.set(self.name, key, value)
    }

    pub fn remove(&self, key: &str) {
        self.store.remove(self.name, key)
    }

    pub fn clear(&self) {
        self.store.clear(self.name)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| v == "true").unwrap_or(false)
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.set(key, if value { "true" } else { "false" })
    }

    /// Integer value, or `0` when absent or unparseable.
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    pub fn set_i64(&self, key: &str, value: i64) {
        self.set(key, &value.to_string())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store.get_json(self.name, key)
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.store.set_json(self.name, key, value)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

type Entries = BTreeMap<String, String>;

/// Stores each namespace as `<namespace>.json` inside a directory.
pub struct FileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the namespace files
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_entries(&self, namespace: &str) -> Entries {
        let path = self.namespace_path(namespace);
        if !path.exists() {
            return Entries::new();
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(namespace, error = %e, "Failed to read store file");
                return Entries::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(namespace, error = %e, "Store file is corrupt, treating as empty");
                Entries::new()
            }
        }
    }

    fn write_entries(&self, namespace: &str, entries: &Entries) {
        if let Err(e) = self.try_write_entries(namespace, entries) {
            warn!(namespace, error = %e, "Failed to persist store file");
        }
    }

    fn try_write_entries(&self, namespace: &str, entries: &Entries) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(self.namespace_path(namespace), contents)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, namespace: &str, key: &str) -> Option<String> {
        let _guard = self.guard();
        self.read_entries(namespace).remove(key)
    }

    fn set(&self, namespace: &str, key: &str, value: &str) {
        let _guard = self.guard();
        let mut entries = self.read_entries(namespace);
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(namespace, &entries);
    }

    fn remove(&self, namespace: &str, key: &str) {
        let _guard = self.guard();
        let mut entries = self.read_entries(namespace);
        if entries.remove(key).is_some() {
            self.write_entries(namespace, &entries);
        }
    }

    fn clear(&self, namespace: &str) {
        let _guard = self.guard();
        let path = self.namespace_path(namespace);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(namespace, error = %e, "Failed to remove store file");
            }
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, String>>> {
        self.namespaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.guard().get(namespace)?.get(key).cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: &str) {
        self.guard()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, namespace: &str, key: &str) {
        if let Some(entries) = self.guard().get_mut(namespace) {
            entries.remove(key);
        }
    }

    fn clear(&self, namespace: &str) {
        self.guard().remove(namespace);
    }
}
