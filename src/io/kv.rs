use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Error type for key-value writes. Quota exhaustion is a recoverable
/// condition: the caller reports it and keeps its in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Abstract persistent key-value store the engine reads from and writes
/// to. Reads that fail for any reason surface as `None`: a missing key
/// and an unreadable one are treated alike.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<(), KvError>;
}

/// In-memory store. The optional quota caps the serialized size of a
/// single value, standing in for a full backing store in tests.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    map: HashMap<String, serde_json::Value>,
    quota_bytes: Option<usize>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        MemStore {
            map: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<(), KvError> {
        if let Some(quota) = self.quota_bytes {
            let size = serde_json::to_string(&value)?.len();
            if size > quota {
                return Err(KvError::QuotaExceeded);
            }
        }
        self.map.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a directory.
/// Writes go through a temp file in the same directory so a crash mid-save
/// never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> Result<Self, KvError> {
        fs::create_dir_all(dir)?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let content = fs::read_to_string(self.key_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<(), KvError> {
        let content = serde_json::to_string_pretty(&value)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        fs::write(tmp.path(), content)?;
        tmp.persist(self.key_path(key))
            .map_err(|e| KvError::Io(e.error))?;
        Ok(())
    }
}
