//! Key/value persistence for booked seats.

use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::occupancy::OccupancyMap;

/// Storage key under which the occupancy map is kept.
pub const DEFAULT_STORAGE_KEY: &str = "movie-occupied-seats";

/// Directory under the user's data dir used for storage files.
pub const DEFAULT_DATA_DIR: &str = "seatbook";

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    /// Reading an existing entry failed.
    #[error("failed to read {path}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Writing an entry failed.
    #[error("failed to write {path}")]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The value could not be encoded.
    #[error("failed to encode stored value")]
    Encode(#[from] serde_json::Error),
}

/// String key/value capability, modelled after browser local storage.
pub trait Storage {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    /// Directory holding the storage files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let component = sanitize_key(key);
        if component.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{component}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let write_err = |source: io::Error| StorageError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(write_err)?;

        // Replace via rename so a crash never leaves a half-written file.
        let mut temp = NamedTempFile::new_in(&self.root).map_err(write_err)?;
        temp.write_all(value.as_bytes()).map_err(write_err)?;
        temp.persist(&path).map_err(|err| write_err(err.error))?;
        debug!(path = %path.display(), bytes = value.len(), "Storage entry written");
        Ok(())
    }
}

/// Process-local storage used by tests and ephemeral sessions.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a single entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the occupancy map under a single storage key.
#[derive(Debug, Clone)]
pub struct OccupancyStore<S> {
    storage: S,
    key: String,
}

impl<S: Storage> OccupancyStore<S> {
    /// Bind `storage` using the default key.
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Bind `storage` using a custom key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The key this store reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the persisted map. Missing or unreadable data yields an empty map.
    pub fn load(&self) -> OccupancyMap {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return OccupancyMap::new(),
            Err(err) => {
                warn!(key = %self.key, "Failed to read bookings, starting empty: {err}");
                return OccupancyMap::new();
            }
        };
        match OccupancyMap::from_json(&raw) {
            Ok(map) => map,
            Err(err) => {
                warn!(key = %self.key, "Stored bookings are corrupt, starting empty: {err}");
                OccupancyMap::new()
            }
        }
    }

    /// Overwrite the persisted map.
    pub fn save(&self, map: &OccupancyMap) -> Result<(), StorageError> {
        let serialized = map.to_json()?;
        self.storage.set(&self.key, &serialized)
    }
}

fn sanitize_key(input: &str) -> String {
    input
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::MovieId, seat::SeatIndex};
    use anyhow::Result;
    use tempfile::tempdir;

    fn sample_map() -> OccupancyMap {
        let mut map = OccupancyMap::new();
        let seats = [0, 1, 47].into_iter().filter_map(SeatIndex::new);
        map.occupy(MovieId(1), seats);
        map.occupy(MovieId(3), SeatIndex::new(12));
        map
    }

    #[test]
    fn file_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = OccupancyStore::new(FileStorage::new(dir.path().join("nested")));
        assert!(store.load().is_empty());

        let map = sample_map();
        store.save(&map)?;
        let path = store.storage().path_for(store.key())?;
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path)?, r#"{"1":[0,1,47],"3":[12]}"#);
        assert_eq!(store.load(), map);
        Ok(())
    }

    #[test]
    fn save_overwrites_previous_value() -> Result<()> {
        let storage = MemoryStorage::new();
        let store = OccupancyStore::with_key(storage.clone(), "seats");
        store.save(&sample_map())?;
        store.save(&OccupancyMap::new())?;
        assert_eq!(storage.get("seats")?, Some("{}".to_string()));
        Ok(())
    }

    #[test]
    fn malformed_value_loads_empty() {
        let store = OccupancyStore::new(MemoryStorage::with_entry(DEFAULT_STORAGE_KEY, "not-json"));
        assert_eq!(store.load(), OccupancyMap::new());
    }

    #[test]
    fn unreadable_file_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());
        // A directory where the file should be makes the read fail.
        fs::create_dir_all(storage.path_for(DEFAULT_STORAGE_KEY)?)?;
        let store = OccupancyStore::new(storage);
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn rejects_keys_without_safe_characters() {
        let storage = FileStorage::new("unused");
        assert!(matches!(
            storage.path_for("../"),
            Err(StorageError::InvalidKey(_))
        ));
        assert_eq!(
            storage.path_for("movie seats!").ok(),
            Some(PathBuf::from("unused").join("movieseats.json"))
        );
    }
}
