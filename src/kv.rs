use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`. Unreadable values are reported as absent.
    fn get(&self, key: &str) -> Option<String>;
    /// Replaces the value for `key` and notifies subscribers.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

fn publish(sender: &broadcast::Sender<StorageEvent>, key: &str, value: &str) {
    let event = StorageEvent {
        key: key.to_string(),
        new_value: Some(value.to_string()),
    };
    // No receivers is fine: nobody is listening yet.
    if let Ok(n) = sender.send(event) {
        debug!(key, receivers = n, "storage event published");
    }
}

/// In-memory store. Clones of an `Arc<MemoryStore>` behave like tabs of one
/// browser profile.
#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Writes a raw value without notifying anyone. Used to seed state.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        publish(&self.events, key, value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

/// Store backed by a directory, one `<key>.json` file per key. Writes go to
/// a temporary file that is renamed over the target, so readers see either
/// the old or the new value.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            events,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn write_atomic(&self, key: &str, value: &str) -> std::io::Result<()> {
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        let result = std::fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(value.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp, &target));
        if result.is_err() {
            if let Err(e) = std::fs::remove_file(&tmp) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", tmp.display(), e);
                }
            }
        }
        result
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.write_atomic(key, value)
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;
        publish(&self.events, key, value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
