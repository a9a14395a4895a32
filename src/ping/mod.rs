//! Wire protocols for outbound pings
//!
//! This module provides a trait-based seam between the delivery unit and the
//! two protocols spoken by ping services:
//!
//! - [`WebSubClient`]: publish notification to a WebSub (PubSubHubbub) hub
//! - [`XmlRpcClient`]: `weblogUpdates.ping` over XML-RPC
//!
//! Both implement [`PingTransport`]. [`build_transport`] picks the right one
//! for a configured service.
//!
//! ## Usage
//!
//! ```no_run
//! use pingcast::config::{Protocol, ServiceConfig};
//! use pingcast::ping::build_transport;
//! use pingcast::types::PingTarget;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let service = ServiceConfig::new("Twingly", "https://rpc.twingly.com/", Protocol::XmlRpc);
//! let transport = build_transport(&service, reqwest::Client::new());
//!
//! let target = PingTarget::new("https://example.com/post", "https://example.com/feed");
//! let _ = transport.ping(&target, Duration::from_secs(10)).await;
//! # }
//! ```

mod http;
mod traits;
pub mod websub;
pub mod xmlrpc;

pub use http::{DEFAULT_RETRY_AFTER_SECS, parse_retry_after};
pub use traits::PingTransport;
pub use websub::WebSubClient;
pub use xmlrpc::XmlRpcClient;

use std::sync::Arc;

use crate::config::{Protocol, ServiceConfig};

/// Build the transport for one configured service
///
/// The `reqwest::Client` is shared so connections are pooled across services.
pub fn build_transport(service: &ServiceConfig, client: reqwest::Client) -> Arc<dyn PingTransport> {
    match service.protocol {
        Protocol::WebSub => Arc::new(WebSubClient::new(client, service.endpoint.clone())),
        Protocol::XmlRpc => Arc::new(XmlRpcClient::new(client, service.endpoint.clone())),
    }
}
