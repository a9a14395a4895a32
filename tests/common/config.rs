//! Test configuration builders

use pingcast::{Config, Protocol, ServiceConfig};
use std::time::Duration;
use wiremock::MockServer;

/// Public base URL used for feed URLs in tests
pub const PUBLIC_URL: &str = "https://ping.example.com";

/// Configuration with no services and fast retries
pub fn base_config() -> Config {
    let mut config = Config::default();
    config.services.clear();
    config.feed.public_base_url = PUBLIC_URL.to_string();
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(100);
    config
}

/// Service entry pointing at a mock server, allowing two retries
pub fn service_for(name: &str, server: &MockServer, protocol: Protocol) -> ServiceConfig {
    ServiceConfig {
        timeout: Duration::from_secs(2),
        max_retries: 2,
        ..ServiceConfig::new(name, server.uri(), protocol)
    }
}
