//! JsonStore: whole-document JSON persistence keyed by entity kind.
//!
//! Layout:
//! ```text
//! {data_dir}/
//! ├── talks.json
//! ├── speakers.json
//! ├── users.json
//! ├── ratings.json
//! └── comments.json
//! ```
//!
//! Loads never fail: a missing or unreadable file is logged and returned as
//! the empty document. Saves write to a temp path and rename, so a crash
//! mid-write never truncates the previous document.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::kind::EntityKind;

/// Errors from persisting a document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {kind} document: {source}")]
    Write {
        kind: EntityKind,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {kind} document: {source}")]
    Serialize {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Whole-document JSON store over one data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    /// Open a store at the given data directory, creating it if needed.
    pub fn new(data_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Path of the document file for a kind.
    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// The data directory this store reads and writes.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the full document for a kind.
    ///
    /// A missing file, an IO failure, or malformed JSON all yield the empty
    /// document (`T::default()`); the failure is logged, never propagated.
    /// Absence of data is not an error at this layer.
    pub fn load<T>(&self, kind: EntityKind) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path_for(kind);
        if !path.exists() {
            return T::default();
        }

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("failed to read {} from {}: {}", kind, path.display(), e);
                return T::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to parse {} from {}: {}", kind, path.display(), e);
                T::default()
            }
        }
    }

    /// Save the full document for a kind.
    ///
    /// Atomic write: serialize, write to `<file>.tmp`, rename over the
    /// target. Readers see either the old document or the new one, never a
    /// torn write.
    pub fn save<T>(&self, kind: EntityKind, document: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string_pretty(document)
            .map_err(|source| StoreError::Serialize { kind, source })?;

        let path = self.path_for(kind);
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, json).map_err(|source| StoreError::Write { kind, source })?;
        fs::rename(&temp_path, &path).map_err(|source| StoreError::Write { kind, source })?;

        Ok(())
    }
}
