//! Application state for the API server

use crate::{Config, PingDispatcher};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Fan-out engine used by `POST /ping`
    pub dispatcher: Arc<PingDispatcher>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(dispatcher: Arc<PingDispatcher>, config: Arc<Config>) -> Self {
        Self { dispatcher, config }
    }
}
