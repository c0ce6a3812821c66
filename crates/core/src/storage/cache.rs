use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

use super::write_atomic;

/// Last-known-good JSON blobs, one file per key, in an app-private directory.
///
/// No TTL: whatever was written last is trusted when used as a fallback.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9_.-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let name = if sanitized.ends_with(".json") {
            sanitized
        } else {
            format!("{sanitized}.json")
        };
        self.dir.join(name)
    }

    /// Overwrite the blob for `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize cache entry {key}: {e}")))?;
        write_atomic(&self.path_for(key), &bytes)
    }

    /// Read the blob for `key`. A missing file is `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Deserialization(format!("Corrupt cache entry {key}: {e}")))?;
        Ok(Some(value))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Delete one entry. Missing entries are not an error.
    pub fn remove(&self, key: &str) -> Result<(), CoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every cached blob. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize, CoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
