use chrono::{DateTime, Local, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::status::{CaptureMode, CaptureStatus};
use crate::buffer::{unique_output_path, BufferConcatenator, SegmentStore};
use crate::capture::{
    Capabilities, CaptureBackend, CaptureCommand, CaptureInput, CaptureProcessHandle,
    DeviceProbe, OutputTarget, SegmentConfig, GRACEFUL_STOP_TIMEOUT,
};
use crate::catalog::{RecordingCatalog, RecordingKind};
use crate::config::Settings;
use crate::error::CaptureError;

/// Extra ring slots on top of the configured window to absorb segment
/// rotation jitter
pub const SEGMENT_SAFETY_MARGIN: u64 = 2;

/// Number of ring slots needed to cover `buffer_secs`
pub fn max_segments(buffer_secs: u64, segment_secs: u64) -> u64 {
    buffer_secs / segment_secs.max(1) + SEGMENT_SAFETY_MARGIN
}

struct FulltimeSession {
    process: CaptureProcessHandle,
    output_path: PathBuf,
    started_at: DateTime<Utc>,
}

struct BufferSession {
    process: CaptureProcessHandle,
    started_at: DateTime<Utc>,
}

/// A process handle only exists inside an active session
enum SessionState {
    Idle,
    Fulltime(FulltimeSession),
    Buffering(BufferSession),
}

impl SessionState {
    fn mode(&self) -> CaptureMode {
        match self {
            SessionState::Idle => CaptureMode::Idle,
            SessionState::Fulltime(_) => CaptureMode::Fulltime,
            SessionState::Buffering(_) => CaptureMode::Buffering,
        }
    }
}

/// Top-level capture state machine: Idle, Fulltime or Buffering.
///
/// At most one session is active at a time; every `start_*` is refused while
/// another session runs. Methods take `&mut self`, so callers sharing a
/// controller must serialize access themselves (e.g. behind a mutex).
pub struct CaptureController {
    backend: Arc<dyn CaptureBackend>,
    catalog: Arc<dyn RecordingCatalog>,
    settings: Settings,
    capabilities: Capabilities,
    input: CaptureInput,
    store: SegmentStore,
    concatenator: BufferConcatenator,
    stop_timeout: Duration,
    state: SessionState,
}

impl CaptureController {
    /// Create a controller, probing audio device and encoder once
    pub async fn new(
        backend: Arc<dyn CaptureBackend>,
        catalog: Arc<dyn RecordingCatalog>,
        settings: Settings,
    ) -> Self {
        let capabilities = DeviceProbe::new(backend.as_ref()).probe().await;
        Self::with_capabilities(backend, catalog, settings, capabilities)
    }

    /// Create a controller from already-resolved capabilities
    pub fn with_capabilities(
        backend: Arc<dyn CaptureBackend>,
        catalog: Arc<dyn RecordingCatalog>,
        settings: Settings,
        capabilities: Capabilities,
    ) -> Self {
        let store = SegmentStore::new(settings.buffer_dir());
        let concatenator = BufferConcatenator::new(Arc::clone(&backend));

        info!(
            backend = backend.name(),
            encoder = %capabilities.encoder,
            output_dir = %settings.output_dir.display(),
            buffer_dir = %store.dir().display(),
            "Capture controller ready"
        );

        Self {
            backend,
            catalog,
            settings,
            capabilities,
            input: CaptureInput::native(),
            store,
            concatenator,
            stop_timeout: GRACEFUL_STOP_TIMEOUT,
            state: SessionState::Idle,
        }
    }

    pub fn with_input(mut self, input: CaptureInput) -> Self {
        self.input = input;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn with_concatenator(mut self, concatenator: BufferConcatenator) -> Self {
        self.concatenator = concatenator;
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.state.mode()
    }

    pub fn is_recording(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn buffer_dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn status(&self) -> CaptureStatus {
        let (output_path, started_at) = match &self.state {
            SessionState::Idle => (None, None),
            SessionState::Fulltime(s) => (Some(s.output_path.clone()), Some(s.started_at)),
            SessionState::Buffering(s) => (None, Some(s.started_at)),
        };

        let elapsed_secs = started_at.map(|t| {
            Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0
        });

        CaptureStatus {
            mode: self.mode(),
            output_path,
            started_at,
            elapsed_secs,
            buffer_window_secs: self.settings.buffer_duration_seconds(),
            encoder: self.capabilities.encoder,
            audio_device: self.capabilities.audio_device.clone(),
        }
    }

    /// Start continuous recording to `<output_dir>/recording_<timestamp>.mp4`
    pub async fn start_fulltime(&mut self) -> Result<(), CaptureError> {
        self.ensure_idle()?;

        // A previous buffer session's leftovers must not linger
        self.store.clear();

        fs::create_dir_all(&self.settings.output_dir)?;
        let output_path = unique_output_path(
            &self.settings.output_dir,
            &format!("recording_{}", timestamp()),
            "mp4",
        );

        let args = self.command().build(&OutputTarget::File(output_path.clone()));
        let process = self.spawn(&args).await?;

        info!("Fulltime recording started: {}", output_path.display());

        self.state = SessionState::Fulltime(FulltimeSession {
            process,
            output_path,
            started_at: Utc::now(),
        });

        Ok(())
    }

    /// Stop continuous recording.
    ///
    /// Returns the recorded file if it exists on disk afterwards.
    pub async fn stop_fulltime(&mut self) -> Option<PathBuf> {
        let session = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Fulltime(session) => session,
            other => {
                debug!("stop_fulltime ignored in {} mode", other.mode());
                self.state = other;
                return None;
            }
        };

        let outcome = session.process.stop().await;
        debug!(?outcome, "Fulltime capture process stopped");

        let path = session.output_path;
        if !path.exists() {
            warn!("Fulltime recording produced no file at {}", path.display());
            return None;
        }

        info!("Fulltime recording saved: {}", path.display());
        self.register(&path, RecordingKind::Fulltime).await;

        Some(path)
    }

    /// Start the rolling replay buffer
    pub async fn start_buffer(&mut self) -> Result<(), CaptureError> {
        self.ensure_idle()?;

        // Old segments would be indistinguishable from new ones
        self.store.clear();
        self.store.ensure_dir()?;

        let segment_secs = self.settings.segment_duration_seconds();
        let config = SegmentConfig {
            segment_secs,
            wrap: max_segments(self.settings.buffer_duration_seconds(), segment_secs),
        };

        let args = self.command().build(&self.store.target(config));
        let process = self.spawn(&args).await?;

        info!(
            segment_secs = config.segment_secs,
            slots = config.wrap,
            "Replay buffer started in {}",
            self.store.dir().display()
        );

        self.state = SessionState::Buffering(BufferSession {
            process,
            started_at: Utc::now(),
        });

        Ok(())
    }

    /// Stop buffering and join the ring into `<output_dir>/replay_<timestamp>.mp4`.
    ///
    /// The buffer directory is drained afterwards whether or not the join
    /// succeeded; the controller is idle on every return path.
    pub async fn save_buffer(&mut self) -> Result<PathBuf, CaptureError> {
        let session = self.take_buffer_session()?;

        let outcome = session.process.stop().await;
        debug!(?outcome, "Buffer capture process stopped");

        let result = self.assemble_buffer().await;
        self.store.clear();

        let path = result?;
        self.register(&path, RecordingKind::Buffer).await;

        Ok(path)
    }

    /// Stop buffering and discard every segment.
    ///
    /// Returns false when no buffer session was active.
    pub async fn cancel_buffer(&mut self) -> bool {
        let Ok(session) = self.take_buffer_session() else {
            debug!("cancel_buffer ignored in {} mode", self.mode());
            return false;
        };

        session.process.stop().await;
        self.store.clear();

        info!("Replay buffer cancelled");
        true
    }

    /// Bring the controller back to idle, keeping a fulltime recording and
    /// discarding a buffer
    pub async fn shutdown(&mut self) {
        match self.mode() {
            CaptureMode::Idle => {}
            CaptureMode::Fulltime => {
                self.stop_fulltime().await;
            }
            CaptureMode::Buffering => {
                self.cancel_buffer().await;
            }
        }
    }

    async fn assemble_buffer(&self) -> Result<PathBuf, CaptureError> {
        let segments = self.store.list_segments()?;
        if segments.is_empty() {
            warn!("No buffer segments in {}", self.store.dir().display());
            return Err(CaptureError::NoSegments);
        }

        fs::create_dir_all(&self.settings.output_dir)?;
        let output_path = unique_output_path(
            &self.settings.output_dir,
            &format!("replay_{}", timestamp()),
            "mp4",
        );

        if let Err(e) = self
            .concatenator
            .concatenate(&segments, self.store.dir(), &output_path)
            .await
        {
            // A failed or timed-out join may have left a truncated file
            discard_partial(&output_path);
            return Err(e);
        }

        if !output_path.exists() {
            return Err(CaptureError::Concat(format!(
                "no output produced at {}",
                output_path.display()
            )));
        }

        info!(
            segments = segments.len(),
            "Replay saved: {}",
            output_path.display()
        );

        Ok(output_path)
    }

    fn take_buffer_session(&mut self) -> Result<BufferSession, CaptureError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Buffering(session) => Ok(session),
            other => {
                self.state = other;
                Err(CaptureError::NotActive(CaptureMode::Buffering))
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), CaptureError> {
        match self.mode() {
            CaptureMode::Idle => Ok(()),
            active => {
                warn!("Refusing to start: {} session already active", active);
                Err(CaptureError::AlreadyActive(active))
            }
        }
    }

    fn command(&self) -> CaptureCommand {
        CaptureCommand::new(
            self.capabilities.encoder,
            self.capabilities.audio_device.clone(),
        )
        .with_input(self.input.clone())
        .with_framerate(self.settings.framerate)
    }

    async fn spawn(&self, args: &[String]) -> Result<CaptureProcessHandle, CaptureError> {
        match CaptureProcessHandle::spawn(self.backend.as_ref(), args).await {
            Ok(handle) => Ok(handle.with_stop_timeout(self.stop_timeout)),
            Err(e) => {
                error!("Failed to start capture: {}", e);
                Err(e)
            }
        }
    }

    /// Catalog failures never affect the recording itself
    async fn register(&self, path: &Path, kind: RecordingKind) {
        if let Err(e) = self.catalog.record(path, kind).await {
            error!("Failed to catalog {} ({}): {:#}", path.display(), kind, e);
        }
    }
}

fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => warn!("Removed partial replay {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial replay {}: {}", path.display(), e),
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
