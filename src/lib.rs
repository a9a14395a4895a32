//! # pingcast
//!
//! Fan-out notifier for blog ping services.
//!
//! Given a handful of updated page URLs, pingcast tells every configured
//! service about them at once: WebSub (PubSubHubbub) hubs get a publish
//! notification for a feed listing the pages, and XML-RPC services get a
//! `weblogUpdates.ping` per page.
//!
//! ## Design
//!
//! - **Never throws per service** - every delivery ends as an outcome, so one
//!   broken service cannot abort the others
//! - **Bounded** - each attempt has its own deadline and the whole request has
//!   an execution budget
//! - **Stateless** - nothing is persisted; a ping is never retried after the
//!   request ends
//!
//! ## Quick Start
//!
//! ```no_run
//! use pingcast::{Config, PingDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let dispatcher = PingDispatcher::new(&config)?;
//!
//!     let report = dispatcher
//!         .ping(&["https://example.com/new-post".to_string()], None)
//!         .await?;
//!
//!     for result in &report.results {
//!         println!("{}: {} ({})", result.service, result.success, result.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-service result aggregation
pub mod aggregate;
/// REST API module
pub mod api;
/// Execution-time budget
pub mod budget;
/// Configuration types
pub mod config;
/// Per-service delivery with retry
pub mod delivery;
/// Batch orchestrator
pub mod dispatcher;
/// Error types
pub mod error;
/// Atom feed announced to WebSub hubs
pub mod feed;
/// WebSub and XML-RPC transports
pub mod ping;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Request validation and SSRF guard
pub mod validation;

// Re-export commonly used types
pub use config::{Config, Protocol, ServiceConfig};
pub use dispatcher::PingDispatcher;
pub use error::{ApiError, DeliveryError, Error, ErrorDetail, Result, ToHttpStatus, ValidationError};
pub use ping::{PingTransport, WebSubClient, XmlRpcClient};
pub use types::{DeliveryOutcome, PingMethod, PingReport, PingTarget, ServiceReport};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub(crate) async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
