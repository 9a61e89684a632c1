use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{RecordingCatalog, RecordingEntry, RecordingKind};

/// Catalog stored as a pretty-printed JSON array
pub struct JsonCatalog {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<RecordingEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Corrupt catalog file: {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    async fn save(&self, entries: &[RecordingEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create catalog directory")?;
        }

        let json = serde_json::to_vec_pretty(entries)?;

        // Write then rename so a crash never leaves a truncated catalog
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordingCatalog for JsonCatalog {
    async fn record(&self, path: &Path, kind: RecordingKind) -> Result<String> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Recording not found: {}", path.display()))?;

        let entry = RecordingEntry {
            id: uuid::Uuid::new_v4().to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            kind,
            size_bytes: metadata.len(),
            created_at: Utc::now(),
        };

        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        // File paths are unique; re-recording replaces the old entry
        entries.retain(|e| e.path != entry.path);
        entries.push(entry.clone());
        self.save(&entries).await?;

        info!(
            id = %entry.id,
            kind = %kind,
            size_bytes = entry.size_bytes,
            "Catalogued {}",
            path.display()
        );

        Ok(entry.id)
    }

    async fn list(&self) -> Result<Vec<RecordingEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        // Ties keep the most recently appended entry first
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn get(&self, id: &str) -> Result<Option<RecordingEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|e| e.id == id))
    }

    async fn delete(&self, id: &str, delete_file: bool) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        // The file goes first so a failed removal keeps the entry
        if delete_file {
            let path = &entries[pos].path;
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!("Deleted recording file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Recording file already gone: {}", path.display())
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to delete {}", path.display()))
                }
            }
        }

        let entry = entries.remove(pos);
        self.save(&entries).await?;

        info!(id = %entry.id, "Removed {} from catalog", entry.filename);
        Ok(true)
    }
}
