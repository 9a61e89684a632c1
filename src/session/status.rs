use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::EncoderProfile;

/// Which kind of session the controller is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Idle,
    /// Continuous recording to a single file
    Fulltime,
    /// Rolling segment buffer, saved on demand
    Buffering,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            CaptureMode::Idle => "idle",
            CaptureMode::Fulltime => "fulltime",
            CaptureMode::Buffering => "buffering",
        })
    }
}

/// Snapshot of the controller for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub mode: CaptureMode,

    /// Target file of a fulltime session
    pub output_path: Option<PathBuf>,

    /// When the active session started
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the active session started
    pub elapsed_secs: Option<f64>,

    /// Configured replay window in seconds
    pub buffer_window_secs: u64,

    pub encoder: EncoderProfile,

    pub audio_device: Option<String>,
}
