//! Core types for pingcast

use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::config::{Protocol, ServiceConfig};

/// Protocol method reported alongside each result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PingMethod {
    /// WebSub hub publish
    #[serde(rename = "WebSub")]
    WebSub,
    /// XML-RPC `weblogUpdates.ping`
    #[serde(rename = "XML-RPC")]
    XmlRpc,
}

impl From<Protocol> for PingMethod {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::WebSub => PingMethod::WebSub,
            Protocol::XmlRpc => PingMethod::XmlRpc,
        }
    }
}

impl std::fmt::Display for PingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingMethod::WebSub => write!(f, "WebSub"),
            PingMethod::XmlRpc => write!(f, "XML-RPC"),
        }
    }
}

/// What a single ping announces
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingTarget {
    /// Site name sent to XML-RPC services (hostname without `www.`)
    pub site_name: String,
    /// The updated page URL
    pub site_url: String,
    /// Feed URL announced to WebSub hubs
    pub feed_url: String,
}

impl PingTarget {
    /// Build a target for `site_url`, deriving the site name from its hostname
    pub fn new(site_url: &str, feed_url: &str) -> Self {
        Self {
            site_name: site_name_for(site_url),
            site_url: site_url.to_string(),
            feed_url: feed_url.to_string(),
        }
    }
}

/// Derive the XML-RPC site name: hostname with a leading `www.` stripped,
/// or the raw input when it does not parse
pub fn site_name_for(site_url: &str) -> String {
    match url::Url::parse(site_url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => site_url.to_string(),
        },
        Err(_) => site_url.to_string(),
    }
}

/// Positive acknowledgement from a service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingAck {
    /// Human readable acknowledgement
    pub message: String,
    /// HTTP status, when the protocol exposes one
    pub status: Option<u16>,
}

/// Result of delivering one URL to one service, after all retries
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryOutcome {
    /// Service name
    pub service: String,
    /// Whether the service accepted the ping
    pub success: bool,
    /// Human readable summary
    pub message: String,
    /// Protocol used
    pub method: PingMethod,
    /// Wall-clock time across all attempts, including backoff
    pub elapsed: Duration,
    /// Number of attempts made (0 when the delivery was skipped)
    pub attempts: u32,
    /// Short failure reason
    pub error: Option<String>,
    /// Seconds the service asked us to wait before retrying
    pub retry_after: Option<u64>,
}

impl DeliveryOutcome {
    /// Outcome injected when the execution budget no longer allows starting the call
    pub fn skipped(service: &ServiceConfig) -> Self {
        Self {
            service: service.name.clone(),
            success: false,
            message: "Skipped: execution time budget exhausted (timeout protection)".to_string(),
            method: service.protocol.into(),
            elapsed: Duration::ZERO,
            attempts: 0,
            error: Some("timeout protection".to_string()),
            retry_after: None,
        }
    }

    /// Outcome for a delivery that panicked instead of returning
    pub fn internal_failure(service: &ServiceConfig) -> Self {
        Self {
            service: service.name.clone(),
            success: false,
            message: "Delivery failed unexpectedly".to_string(),
            method: service.protocol.into(),
            elapsed: Duration::ZERO,
            attempts: 0,
            error: Some("internal error".to_string()),
            retry_after: None,
        }
    }
}

/// Per-service result across every URL in the request
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport {
    /// Service name
    pub service: String,
    /// True only when every URL succeeded for this service
    pub success: bool,
    /// Human readable summary
    pub message: String,
    /// Protocol used
    pub method: PingMethod,
    /// Summed elapsed time in milliseconds
    pub response_time: u64,
    /// First failure reason, if any URL failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Largest retry hint returned by the service, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Response of one ping request
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PingReport {
    /// True when any service succeeded for any URL
    pub success: bool,
    /// One entry per service, in configuration order
    pub results: Vec<ServiceReport>,
    /// Total wall-clock time in milliseconds
    pub total_time: u64,
    /// Feed announced to WebSub hubs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
}

impl PingReport {
    /// Look up the result for one service
    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.results.iter().find(|r| r.service == name)
    }
}

/// Public description of a configured service
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Protocol used
    pub method: PingMethod,
    /// Hub or RPC endpoint
    pub endpoint: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl From<&ServiceConfig> for ServiceInfo {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            name: config.name.clone(),
            method: config.protocol.into(),
            endpoint: config.endpoint.clone(),
            timeout_ms: config.timeout.as_millis() as u64,
            max_retries: config.max_retries,
        }
    }
}
