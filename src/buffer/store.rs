use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::capture::{OutputTarget, SegmentConfig};

const SEGMENT_PREFIX: &str = "buffer_";
const SEGMENT_EXTENSION: &str = "mp4";

/// Extensions removed alongside segments when the buffer is drained
const PLAYLIST_EXTENSION: &str = "m3u8";
const TRANSPORT_STREAM_EXTENSION: &str = "ts";

/// One ring-buffer segment on disk.
///
/// The index is the wrapping slot number taken from the filename; it is reused
/// once the ring wraps, so only `modified` orders segments in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of one cleanup pass
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: usize,
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Directory holding the rolling segment files of the active buffer session
#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
}

impl SegmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Backend output target writing segments into this directory
    pub fn target(&self, config: SegmentConfig) -> OutputTarget {
        OutputTarget::segments(&self.dir, config)
    }

    /// Segments ordered by modification time, oldest first.
    ///
    /// A missing directory means no segments.
    pub fn list_segments(&self) -> io::Result<Vec<Segment>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut segments = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            let Some(index) = segment_index(&path) else {
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping unreadable segment {}: {}", path.display(), e);
                    continue;
                }
            };

            segments.push(Segment {
                index,
                path,
                modified: metadata.modified()?,
            });
        }

        // Equal timestamps (coarse filesystem clocks) fall back to the path
        segments.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        Ok(segments)
    }

    /// Best-effort removal of segment, playlist and transport-stream files.
    ///
    /// Individual failures are collected into the report and logged once;
    /// they never fail the caller.
    pub fn clear(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                report.failures.push((self.dir.clone(), e));
                log_report(&self.dir, &report);
                return report;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    report.failures.push((self.dir.clone(), e));
                    continue;
                }
            };

            if !is_buffer_artifact(&path) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => report.failures.push((path, e)),
            }
        }

        log_report(&self.dir, &report);
        report
    }
}

fn log_report(dir: &Path, report: &CleanupReport) {
    if report.is_clean() {
        debug!("Buffer cleanup removed {} files from {}", report.removed, dir.display());
        return;
    }

    let failed: Vec<String> = report
        .failures
        .iter()
        .map(|(path, e)| format!("{} ({})", path.display(), e))
        .collect();

    warn!(
        removed = report.removed,
        failed = report.failures.len(),
        "Buffer cleanup incomplete in {}: {}",
        dir.display(),
        failed.join(", ")
    );
}

/// Slot index of a `buffer_NNNN.mp4` file
fn segment_index(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != SEGMENT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(SEGMENT_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_buffer_artifact(path: &Path) -> bool {
    if segment_index(path).is_some() {
        return true;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(PLAYLIST_EXTENSION) | Some(TRANSPORT_STREAM_EXTENSION)
    )
}
