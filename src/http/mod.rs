//! HTTP API server for external control
//!
//! - GET /health - Health check
//! - GET /status - Controller mode and capabilities
//! - GET /recordings - Catalogued recordings
//! - GET /recordings/:id, DELETE /recordings/:id?delete_file= - One recording
//! - POST /fulltime/start, /fulltime/stop - Continuous recording
//! - POST /buffer/start, /buffer/save, /buffer/cancel - Replay buffer

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
