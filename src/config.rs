//! Configuration types for pingcast
//!
//! Everything here is read-only once the dispatcher is built. The server binary
//! loads a JSON file (see [`Config::from_json_file`]) and then applies
//! environment overrides with [`Config::apply_env`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, path::Path, time::Duration};

/// Environment variable overriding [`ApiConfig::bind_address`]
pub const ENV_BIND: &str = "PINGCAST_BIND";

/// Environment variable overriding [`FeedConfig::public_base_url`]
pub const ENV_PUBLIC_URL: &str = "PINGCAST_PUBLIC_URL";

/// Hard ceiling on URLs per request
pub const MAX_URLS_LIMIT: usize = 5;

/// Main configuration for pingcast
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Downstream services to notify (WebSub hubs and XML-RPC ping endpoints)
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,

    /// Backoff between attempts against a single service
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batching and execution budget for one ping request
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Feed published to WebSub hubs
    #[serde(default)]
    pub feed: FeedConfig,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: default_services(),
            retry: RetryConfig::default(),
            dispatch: DispatchConfig::default(),
            feed: FeedConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Apply `PINGCAST_BIND` and `PINGCAST_PUBLIC_URL` overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_BIND).ok(),
            std::env::var(ENV_PUBLIC_URL).ok(),
        )
    }

    fn apply_overrides(&mut self, bind: Option<String>, public_url: Option<String>) -> Result<()> {
        if let Some(bind) = bind {
            self.api.bind_address = bind
                .parse()
                .map_err(|e| Error::config(ENV_BIND, format!("invalid bind address '{bind}': {e}")))?;
        }
        if let Some(public_url) = public_url {
            self.feed.public_base_url = public_url;
        }
        Ok(())
    }

    /// Check the configuration for values that would make dispatch misbehave
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(Error::config("services", "at least one service is required"));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(Error::config("services.name", "service name cannot be empty"));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(Error::config(
                    "services.name",
                    format!("duplicate service name '{}'", service.name),
                ));
            }
            match url::Url::parse(&service.endpoint) {
                Ok(endpoint) if matches!(endpoint.scheme(), "http" | "https") => {}
                _ => {
                    return Err(Error::config(
                        "services.endpoint",
                        format!(
                            "service '{}' has invalid endpoint '{}'",
                            service.name, service.endpoint
                        ),
                    ));
                }
            }
            if service.timeout.is_zero() {
                return Err(Error::config(
                    "services.timeout",
                    format!("service '{}' has a zero timeout", service.name),
                ));
            }
        }

        if self.dispatch.batch_size == 0 {
            return Err(Error::config("dispatch.batch_size", "batch size must be at least 1"));
        }
        if !(1..=MAX_URLS_LIMIT).contains(&self.dispatch.max_urls) {
            return Err(Error::config(
                "dispatch.max_urls",
                format!("max_urls must be between 1 and {MAX_URLS_LIMIT}"),
            ));
        }
        if self.dispatch.safety_margin >= self.dispatch.execution_budget {
            return Err(Error::config(
                "dispatch.safety_margin",
                "safety margin must be smaller than the execution budget",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be at least 1.0",
            ));
        }
        if url::Url::parse(&self.feed.public_base_url).is_err() {
            return Err(Error::config(
                "feed.public_base_url",
                format!("invalid public base URL '{}'", self.feed.public_base_url),
            ));
        }

        Ok(())
    }
}

/// Wire protocol spoken by a downstream service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// WebSub (PubSubHubbub) hub publish notification
    WebSub,
    /// XML-RPC `weblogUpdates.ping`
    XmlRpc,
}

/// One downstream service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Display name, also the key used for service selection and aggregation
    pub name: String,

    /// Hub URL (WebSub) or RPC endpoint (XML-RPC)
    pub endpoint: String,

    /// Wire protocol
    pub protocol: Protocol,

    /// Per-attempt timeout (default: 10 seconds)
    #[serde(default = "default_service_timeout", with = "duration_millis")]
    pub timeout: Duration,

    /// Retries after the first attempt for transient failures (default: 1)
    ///
    /// Worst case for one delivery is `timeout * (1 + max_retries)` plus
    /// backoff; keep it under the dispatch budget.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl ServiceConfig {
    /// Create a service with default timeout and retry count
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            protocol,
            timeout: default_service_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 5 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Batching and time budget for one ping request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum URLs accepted per request (default: 5)
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// URLs processed concurrently per batch (default: 2)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Total wall-clock budget for a request (default: 25 seconds)
    ///
    /// Kept below the 30 second ceiling common on serverless hosts. The budget
    /// only stops new work from starting, so in-flight deliveries bounded by
    /// their service timeouts and retries can still run past it.
    #[serde(default = "default_execution_budget", with = "duration_millis")]
    pub execution_budget: Duration,

    /// Minimum remaining budget required to start new work (default: 10 seconds)
    #[serde(default = "default_safety_margin", with = "duration_millis")]
    pub safety_margin: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_urls: default_max_urls(),
            batch_size: default_batch_size(),
            execution_budget: default_execution_budget(),
            safety_margin: default_safety_margin(),
        }
    }
}

/// Feed handed to WebSub hubs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Publicly reachable base URL of this server (default: http://127.0.0.1:8787)
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Feed title (default: "pingcast")
    #[serde(default = "default_feed_title")]
    pub title: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
            title: default_feed_title(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8787)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Maximum request body size in bytes (default: 16 KiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Per-IP rate limiting for `POST /ping`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Sustained requests per minute per IP (default: 10)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Burst size (default: 5)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// IPs exempt from rate limiting
    #[serde(default)]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: default_requests_per_minute(),
            burst_size: default_burst_size(),
            exempt_ips: Vec::new(),
        }
    }
}

// Default value functions
fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::new(
            "Google PubSubHubbub",
            "https://pubsubhubbub.appspot.com/",
            Protocol::WebSub,
        ),
        ServiceConfig::new("Ping-O-Matic", "http://rpc.pingomatic.com/", Protocol::XmlRpc),
        ServiceConfig::new("Twingly", "https://rpc.twingly.com/", Protocol::XmlRpc),
    ]
}

fn default_service_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    1
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_urls() -> usize {
    MAX_URLS_LIMIT
}

fn default_batch_size() -> usize {
    2
}

fn default_execution_budget() -> Duration {
    Duration::from_secs(25)
}

fn default_safety_margin() -> Duration {
    Duration::from_secs(10)
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

fn default_feed_title() -> String {
    "pingcast".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_max_body_bytes() -> usize {
    16 * 1024
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_requests_per_minute() -> u32 {
    10
}

fn default_burst_size() -> u32 {
    5
}

// Duration serialization helper (milliseconds)
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
