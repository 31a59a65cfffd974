//! Directory-backed JSON document store

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),
}

/// Metadata for one stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Document id (filename without extension)
    pub id: String,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// A directory of JSON documents, one file per id
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        debug!(?root, "DirStore::open: called");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save a document under `id`, replacing any previous version
    ///
    /// The document is written to a sibling temp file first and renamed
    /// into place, so readers never observe a partial write.
    pub fn save<T: Serialize>(&self, id: &str, value: &T) -> Result<(), StoreError> {
        debug!(%id, "DirStore::save: called");
        let path = self.path_for(id)?;
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        info!(%id, path = %path.display(), "DirStore::save: document written");
        Ok(())
    }

    /// Load the document stored under `id`
    pub fn load<T: DeserializeOwned>(&self, id: &str) -> Result<T, StoreError> {
        debug!(%id, "DirStore::load: called");
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// List stored documents, newest first
    pub fn list(&self) -> Result<Vec<Entry>, StoreError> {
        debug!(root = %self.root.display(), "DirStore::list: called");
        let mut entries = Vec::new();

        for dirent in fs::read_dir(&self.root)? {
            let dirent = dirent?;
            let path = dirent.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let modified = dirent
                .metadata()?
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            entries.push(Entry {
                id: id.to_string(),
                modified,
            });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Delete the document stored under `id`
    ///
    /// Returns true if a document was removed, false if none existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        debug!(%id, "DirStore::delete: called");
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!(%id, "DirStore::delete: document removed");
        Ok(true)
    }

    /// Check whether a document exists
    pub fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.exists())
    }

    /// Resolve the file path for an id, rejecting ids that escape the root
    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        title: String,
        count: u32,
    }

    fn sample() -> Doc {
        Doc {
            title: "Reset password".to_string(),
            count: 3,
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        store.save("abc", &sample()).unwrap();
        let loaded: Doc = store.load("abc").unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        store.save("abc", &sample()).unwrap();
        let updated = Doc {
            title: "Reset password v2".to_string(),
            count: 4,
        };
        store.save("abc", &updated).unwrap();

        let loaded: Doc = store.load("abc").unwrap();
        assert_eq!(loaded, updated);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        let result: Result<Doc, _> = store.load("nope");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_returns_saved_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        store.save("one", &sample()).unwrap();
        store.save("two", &sample()).unwrap();

        let entries = store.list().unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(entries.len(), 2);
        assert!(ids.contains(&"one"));
        assert!(ids.contains(&"two"));
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        store.save("abc", &sample()).unwrap();
        assert!(store.delete("abc").unwrap());
        assert!(!store.delete("abc").unwrap());
        assert!(!store.exists("abc").unwrap());
    }

    #[test]
    fn test_invalid_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        assert!(matches!(store.save("../evil", &sample()), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.save("", &sample()), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        store.save("abc", &sample()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
