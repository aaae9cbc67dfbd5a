use super::error::RecoveryError;

use std::collections::HashMap;
use std::fs::{remove_file, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable-across-a-reload key-value storage for recovery checkpoints.
///
/// The core never assumes a medium beyond "survives a restart of the same
/// logical session". Keys are already namespaced by the caller
/// (`{session_id}:{concern}`); values are JSON payloads.
///
/// `Debug` is a supertrait so the components holding a store handle can
/// derive `Debug` themselves.
pub trait RecoveryStore: std::fmt::Debug {
    fn put(&self, key: &str, value: &str) -> Result<(), RecoveryError>;
    fn get(&self, key: &str) -> Result<Option<String>, RecoveryError>;
    fn remove(&self, key: &str) -> Result<(), RecoveryError>;
}

/// File-per-key store under a directory.
#[derive(Debug, Clone)]
pub struct FileRecoveryStore {
    dir: PathBuf,
}

impl FileRecoveryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys contain ':' separators; keep filenames portable.
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    fn write_atomic(path: &Path, value: &str) -> Result<(), RecoveryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Atomic write: temp file, then rename over the target.
        let temp_path = path.with_extension("tmp");

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.flush()?;

            // sync_all ensures data is on disk (portable fsync)
            file.sync_all()?;
        }

        rename(&temp_path, path)?;
        Ok(())
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn put(&self, key: &str, value: &str) -> Result<(), RecoveryError> {
        let path = self.key_path(key);
        Self::write_atomic(&path, value)?;
        log::debug!("Checkpointed {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, RecoveryError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path)?;
        let mut value = String::new();
        file.read_to_string(&mut value)?;
        Ok(Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), RecoveryError> {
        let path = self.key_path(key);
        if path.exists() {
            remove_file(&path)?;
            log::debug!("Removed checkpoint {:?}", path);
        }
        Ok(())
    }
}

/// In-memory store for tests and hosts without durable local storage.
#[derive(Debug, Default)]
pub struct MemoryRecoveryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn put(&self, key: &str, value: &str) -> Result<(), RecoveryError> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, RecoveryError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), RecoveryError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
