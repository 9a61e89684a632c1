//! Capture backend plumbing
//!
//! - `backend`: the trait seam between the engine and an external capture tool
//! - `ffmpeg`: the FFmpeg implementation of that seam
//! - `encoder`: encoder profiles and their parameter sets
//! - `command`: pure argument construction
//! - `probe`: one-shot audio device / hardware encoder selection
//! - `process`: owning handle with graceful-then-forced stop

pub mod backend;
pub mod command;
pub mod encoder;
pub mod ffmpeg;
pub mod probe;
pub mod process;

pub use backend::{CaptureBackend, CaptureProcess};
pub use command::{CaptureCommand, CaptureInput, OutputTarget, SegmentConfig, SEGMENT_PATTERN};
pub use encoder::EncoderProfile;
pub use ffmpeg::FfmpegBackend;
pub use probe::{
    select_audio_device, Capabilities, DeviceProbe, AUDIO_DEVICE_PRIORITY,
    HARDWARE_ENCODER_PRIORITY,
};
pub use process::{CaptureProcessHandle, StopOutcome, GRACEFUL_STOP_TIMEOUT};
