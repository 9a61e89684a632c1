//! Capture session management
//!
//! [`CaptureController`] owns the single capture process and moves between
//! three modes:
//! - Idle: nothing running
//! - Fulltime: continuous recording into one file
//! - Buffering: rolling segments, joined into a replay on save

mod controller;
mod status;

pub use controller::{max_segments, CaptureController, SEGMENT_SAFETY_MARGIN};
pub use status::{CaptureMode, CaptureStatus};
