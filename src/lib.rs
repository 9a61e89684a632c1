pub mod buffer;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use buffer::{BufferConcatenator, Segment, SegmentStore};
pub use capture::{
    Capabilities, CaptureBackend, CaptureCommand, CaptureInput, CaptureProcess,
    CaptureProcessHandle, DeviceProbe, EncoderProfile, FfmpegBackend, OutputTarget,
    SegmentConfig,
};
pub use catalog::{JsonCatalog, RecordingCatalog, RecordingEntry, RecordingKind};
pub use config::Settings;
pub use error::CaptureError;
pub use http::{create_router, AppState};
pub use session::{max_segments, CaptureController, CaptureMode, CaptureStatus};
