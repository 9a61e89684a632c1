use serde::Serialize;
use std::io;

use crate::session::CaptureMode;

/// Failures surfaced by the capture engine.
///
/// Graceful-stop timeouts and probe failures are absent: both are
/// recovered inside the engine (forced termination, fallback capabilities) and
/// only logged.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("a {0} session is already active")]
    AlreadyActive(CaptureMode),

    #[error("no {0} session is active")]
    NotActive(CaptureMode),

    #[error("failed to spawn capture backend: {0}")]
    Spawn(String),

    #[error("no buffer segments were recorded")]
    NoSegments,

    #[error("failed to join buffer segments: {0}")]
    Concat(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// Sent to HTTP clients as a plain message
impl Serialize for CaptureError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}
