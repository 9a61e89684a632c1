use anyhow::Result;
use std::io;
use std::path::Path;

use super::encoder::EncoderProfile;
use crate::error::CaptureError;

/// A running capture backend process.
///
/// The engine never reads the process output; it only signals and waits.
#[async_trait::async_trait]
pub trait CaptureProcess: Send + Sync {
    /// Write the graceful-quit byte to the control channel and flush it
    async fn request_stop(&mut self) -> io::Result<()>;

    /// Wait for the process to exit, returning its exit code if it had one
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Forcibly terminate the process and reap it
    async fn kill(&mut self) -> io::Result<()>;

    /// Request forced termination without waiting (usable from `Drop`)
    fn start_kill(&mut self) -> io::Result<()>;

    /// OS process id, if known
    fn id(&self) -> Option<u32>;
}

/// External capture backend
///
/// Implementations:
/// - [`FfmpegBackend`](super::ffmpeg::FfmpegBackend): shells out to FFmpeg
/// - test doubles that script every outcome without running processes
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Launch a capture process with the given arguments
    async fn spawn(&self, args: &[String]) -> Result<Box<dyn CaptureProcess>, CaptureError>;

    /// Enumerate audio capture device names in backend order
    async fn list_audio_devices(&self) -> Result<Vec<String>>;

    /// Encode exactly one synthetic blank frame through `encoder`.
    ///
    /// Returns `Ok(true)` only when the encode actually succeeded.
    async fn test_encoder(&self, encoder: &EncoderProfile) -> Result<bool>;

    /// Losslessly join the files listed in `manifest` into `output`.
    ///
    /// Returns `Ok(false)` when the join ran but exited unsuccessfully.
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<bool>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
