//! Record of finished recordings
//!
//! The capture engine only calls [`RecordingCatalog::record`] and treats any
//! failure as non-fatal. [`JsonCatalog`] is the file-backed implementation.

mod json;

pub use json::JsonCatalog;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a recording was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    Fulltime,
    Buffer,
}

impl RecordingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingKind::Fulltime => "fulltime",
            RecordingKind::Buffer => "buffer",
        }
    }
}

impl std::fmt::Display for RecordingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A catalogued recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
    pub kind: RecordingKind,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait RecordingCatalog: Send + Sync {
    /// Register a finished file, returning its record id
    async fn record(&self, path: &Path, kind: RecordingKind) -> Result<String>;

    /// All entries, newest first
    async fn list(&self) -> Result<Vec<RecordingEntry>>;

    /// Entry with the given id, if any
    async fn get(&self, id: &str) -> Result<Option<RecordingEntry>>;

    /// Remove an entry, and its file on disk when `delete_file` is set.
    ///
    /// Returns false when no entry has that id. A file that is already gone
    /// does not fail the delete.
    async fn delete(&self, id: &str, delete_file: bool) -> Result<bool>;
}
