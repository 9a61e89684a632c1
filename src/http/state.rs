use crate::catalog::RecordingCatalog;
use crate::session::CaptureController;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one capture controller; the mutex serializes every command
    pub controller: Arc<Mutex<CaptureController>>,

    /// Recordings catalog, shared with the controller
    pub catalog: Arc<dyn RecordingCatalog>,
}

impl AppState {
    pub fn new(controller: CaptureController, catalog: Arc<dyn RecordingCatalog>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            catalog,
        }
    }
}
