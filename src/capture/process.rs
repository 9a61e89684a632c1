//! Owning handle around one capture backend invocation.
//!
//! Release is unconditional: [`CaptureProcessHandle::stop`] performs the
//! graceful-then-forced shutdown, and dropping a handle that was never stopped
//! still requests forced termination.

use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::backend::{CaptureBackend, CaptureProcess};
use crate::error::CaptureError;

/// How long a backend gets to exit after the graceful-quit signal
pub const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How a stop completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited on its own after the quit signal
    Graceful(Option<i32>),
    /// Did not exit in time and was terminated
    Killed,
    /// Termination failed as well; the process may still be running
    Abandoned,
}

pub struct CaptureProcessHandle {
    process: Option<Box<dyn CaptureProcess>>,
    stop_timeout: Duration,
}

impl CaptureProcessHandle {
    /// Spawn a backend process with `args`
    pub async fn spawn(
        backend: &dyn CaptureBackend,
        args: &[String],
    ) -> Result<Self, CaptureError> {
        debug!(backend = backend.name(), "Spawning capture process with args: {:?}", args);

        let process = backend.spawn(args).await?;

        info!(
            backend = backend.name(),
            pid = process.id(),
            "Capture process started"
        );

        Ok(Self {
            process: Some(process),
            stop_timeout: GRACEFUL_STOP_TIMEOUT,
        })
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.id())
    }

    /// Stop the process: quit signal, bounded wait, then forced termination.
    ///
    /// Never fails; a process that already exited is handled like a graceful
    /// exit.
    pub async fn stop(mut self) -> StopOutcome {
        let Some(mut process) = self.process.take() else {
            return StopOutcome::Abandoned;
        };

        let pid = process.id();

        if let Err(e) = process.request_stop().await {
            // Typically a closed stdin because the process is already gone
            debug!(?pid, "Failed to send quit signal: {}", e);
        }

        match timeout(self.stop_timeout, process.wait()).await {
            Ok(Ok(code)) => {
                info!(?pid, ?code, "Capture process exited");
                StopOutcome::Graceful(code)
            }
            Ok(Err(e)) => {
                warn!(?pid, "Failed to wait for capture process: {}", e);
                Self::force(process.as_mut(), pid).await
            }
            Err(_) => {
                warn!(
                    ?pid,
                    "Capture process did not exit within {:?}, terminating",
                    self.stop_timeout
                );
                Self::force(process.as_mut(), pid).await
            }
        }
    }

    async fn force(process: &mut dyn CaptureProcess, pid: Option<u32>) -> StopOutcome {
        match process.kill().await {
            Ok(()) => StopOutcome::Killed,
            Err(e) => {
                warn!(?pid, "Failed to terminate capture process: {}", e);
                StopOutcome::Abandoned
            }
        }
    }
}

impl Drop for CaptureProcessHandle {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            warn!(pid = process.id(), "Capture process dropped while running, terminating");
            if let Err(e) = process.start_kill() {
                warn!("Failed to terminate capture process on drop: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for CaptureProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureProcessHandle")
            .field("pid", &self.id())
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}
