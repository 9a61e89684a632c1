use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::store::Segment;
use crate::capture::CaptureBackend;
use crate::error::CaptureError;

/// Upper bound on one lossless join
pub const CONCAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Name of the transient manifest written next to the segments
pub const MANIFEST_FILE: &str = "concat.txt";

/// Joins ordered segments into a single file by stream copy
pub struct BufferConcatenator {
    backend: Arc<dyn CaptureBackend>,
    timeout: Duration,
}

impl BufferConcatenator {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            timeout: CONCAT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join `segments` in the given order into `output`.
    ///
    /// The manifest is written to `manifest_dir` and removed afterwards
    /// whatever the outcome. The concat demuxer resolves relative entries
    /// against the manifest's own directory, so entries are written with
    /// [`manifest_entry`] rather than as configured.
    pub async fn concatenate(
        &self,
        segments: &[Segment],
        manifest_dir: &Path,
        output: &Path,
    ) -> Result<(), CaptureError> {
        let manifest = manifest_dir.join(MANIFEST_FILE);
        let entries: Vec<PathBuf> = segments
            .iter()
            .map(|s| manifest_entry(&s.path, manifest_dir))
            .collect();
        fs::write(&manifest, render_manifest(entries.iter().map(PathBuf::as_path)))?;

        let result = self.run(&manifest, output).await;

        if let Err(e) = fs::remove_file(&manifest) {
            warn!("Failed to remove manifest {}: {}", manifest.display(), e);
        }

        match &result {
            Ok(()) => info!(
                segments = segments.len(),
                "Buffer joined into {}",
                output.display()
            ),
            Err(e) => error!("Buffer join failed: {}", e),
        }

        result
    }

    async fn run(&self, manifest: &Path, output: &Path) -> Result<(), CaptureError> {
        match timeout(self.timeout, self.backend.concat(manifest, output)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(CaptureError::Concat(format!(
                "{} exited unsuccessfully",
                self.backend.name()
            ))),
            Ok(Err(e)) => Err(CaptureError::Concat(format!("{:#}", e))),
            Err(_) => Err(CaptureError::Concat(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Path of `segment` as written into a manifest placed in `manifest_dir`.
///
/// A segment inside `manifest_dir` is listed by file name alone; anything
/// else is made absolute against the working directory.
pub fn manifest_entry(segment: &Path, manifest_dir: &Path) -> PathBuf {
    match (segment.parent(), segment.file_name()) {
        (Some(parent), Some(name)) if parent == manifest_dir => PathBuf::from(name),
        _ => std::path::absolute(segment).unwrap_or_else(|_| segment.to_path_buf()),
    }
}

/// Concat-demuxer manifest: one `file '<path>'` line per entry, forward slashes.
pub fn render_manifest<'a>(paths: impl IntoIterator<Item = &'a Path>) -> String {
    paths
        .into_iter()
        .map(|path| {
            let normalized = path.to_string_lossy().replace('\\', "/");
            // A literal quote is closed, escaped and reopened
            format!("file '{}'\n", normalized.replace('\'', r"'\''"))
        })
        .collect()
}

/// Output file path that does not collide with an existing file
pub fn unique_output_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, extension));
    if !candidate.exists() {
        return candidate;
    }

    (1..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
