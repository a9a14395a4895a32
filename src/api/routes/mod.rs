//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`ping`] - Ping fan-out
//! - [`feed`] - Atom feed announced to WebSub hubs
//! - [`system`] - Health, service listing, OpenAPI

use serde::{Deserialize, Serialize};

mod feed;
mod ping;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use feed::*;
pub use ping::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /ping
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PingRequest {
    /// Updated page URLs (1 to 5, http or https, public hosts only)
    #[serde(default)]
    pub urls: Vec<String>,
    /// Restrict the ping to these configured services (default: all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

/// Query parameters for GET /feed
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
pub struct FeedQuery {
    /// Comma-separated page URLs
    #[serde(default)]
    pub urls: Option<String>,
}
