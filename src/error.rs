//! Error types for pingcast
//!
//! This module provides the error handling for the library, including:
//! - The crate-level [`Error`] used by configuration, validation and the API
//! - [`ValidationError`] for rejected ping requests (always before any network call)
//! - [`DeliveryError`], the closed taxonomy of per-service delivery failures
//! - HTTP status code mapping and the JSON error body returned by the API

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for pingcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pingcast
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "services")
        key: Option<String>,
    },

    /// The ping request was rejected before any network call
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Request body exceeded the configured limit
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted body size in bytes
        limit: usize,
    },

    /// Endpoint does not support the HTTP method used
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// The HTTP method that was used
        method: String,
    },

    /// Network error while building or using the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Unexpected internal fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Reasons a ping request is rejected up front
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request carried no URLs
    #[error("at least one URL is required")]
    NoUrls,

    /// The request carried more URLs than allowed
    #[error("too many URLs: got {count}, maximum is {max}")]
    TooManyUrls {
        /// Number of URLs submitted
        count: usize,
        /// Maximum allowed per request
        max: usize,
    },

    /// A URL could not be parsed or is otherwise unusable
    #[error("URL #{index} ({url}) is invalid: {reason}")]
    InvalidUrl {
        /// Zero-based position in the submitted list
        index: usize,
        /// The offending input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A URL uses something other than http or https
    #[error("URL #{index} ({url}) uses unsupported scheme '{scheme}'; only http and https are allowed")]
    UnsupportedScheme {
        /// Zero-based position in the submitted list
        index: usize,
        /// The offending input
        url: String,
        /// The rejected scheme
        scheme: String,
    },

    /// A URL points at a loopback, private, link-local or internal host
    #[error("URL #{index} ({url}) targets a private/internal address ({host})")]
    PrivateAddress {
        /// Zero-based position in the submitted list
        index: usize,
        /// The offending input
        url: String,
        /// The rejected host
        host: String,
    },

    /// A URL has no host component
    #[error("URL #{index} ({url}) has no host")]
    MissingHost {
        /// Zero-based position in the submitted list
        index: usize,
        /// The offending input
        url: String,
    },

    /// A selected service is not configured
    #[error("unknown service '{name}'")]
    UnknownService {
        /// The requested service name
        name: String,
    },

    /// The service selection was present but empty
    #[error("at least one service must be selected")]
    NoServicesSelected,
}

/// Failure of a single delivery attempt to one downstream service
///
/// Produced where the transport error is first observed so that retry
/// classification matches over this closed set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    /// Connection-level failure (DNS, refused, reset, TLS)
    #[error("network error: {message}")]
    Network {
        /// Transport error description
        message: String,
    },

    /// The attempt exceeded its deadline and was cancelled
    #[error("timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The deadline that was exceeded
        after: Duration,
    },

    /// Malformed response or explicit protocol-level fault
    #[error("{message}")]
    Protocol {
        /// Fault or parse failure description
        message: String,
    },

    /// The service asked us to slow down (HTTP 429 or 503)
    #[error("{message} (retry after {retry_after_secs}s)")]
    RateLimited {
        /// HTTP status returned
        status: u16,
        /// Seconds the service asked us to wait
        retry_after_secs: u64,
        /// Response detail, if any
        message: String,
    },

    /// The service failed with a 5xx status
    #[error("{message}")]
    Server {
        /// HTTP status returned
        status: u16,
        /// Response detail
        message: String,
    },

    /// The service refused the request with a 4xx status
    #[error("{message}")]
    Rejected {
        /// HTTP status returned
        status: u16,
        /// Response detail
        message: String,
    },
}

impl DeliveryError {
    /// Classify a reqwest transport error
    pub fn from_transport(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            DeliveryError::Timeout { after: timeout }
        } else {
            DeliveryError::Network {
                message: error.to_string(),
            }
        }
    }

    /// Short reason string used in outcomes ("timed out", "network error", ...)
    pub fn reason(&self) -> &'static str {
        match self {
            DeliveryError::Network { .. } => "network error",
            DeliveryError::Timeout { .. } => "timed out",
            DeliveryError::Protocol { .. } => "protocol error",
            DeliveryError::RateLimited { .. } => "rate limited",
            DeliveryError::Server { .. } => "server error",
            DeliveryError::Rejected { .. } => "rejected",
        }
    }

    /// HTTP status reported by the service, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::RateLimited { status, .. }
            | DeliveryError::Server { status, .. }
            | DeliveryError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Retry hint surfaced to callers
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            DeliveryError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "too many URLs: got 6, maximum is 5"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create a "rate limited" error
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::with_details(
            "rate_limited",
            "Too many requests",
            serde_json::json!({ "retry_after_seconds": retry_after_secs }),
        )
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,

            // 405 / 413 - Request shape errors
            Error::MethodNotAllowed { .. } => 405,
            Error::PayloadTooLarge { .. } => 413,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::MethodNotAllowed { .. } => "method_not_allowed",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // Server-side detail stays in the logs
        if error.status_code() >= 500 {
            tracing::error!(error = %error, code = %code, "request failed with internal error");
            return ApiError::new(code, "An internal error occurred");
        }

        let message = error.to_string();
        let details = match &error {
            Error::Validation(ValidationError::TooManyUrls { count, max }) => {
                Some(serde_json::json!({
                    "count": count,
                    "max": max,
                }))
            }
            Error::Validation(
                ValidationError::InvalidUrl { index, url, .. }
                | ValidationError::UnsupportedScheme { index, url, .. }
                | ValidationError::MissingHost { index, url },
            ) => Some(serde_json::json!({
                "index": index,
                "url": url,
            })),
            Error::Validation(ValidationError::PrivateAddress { index, url, host }) => {
                Some(serde_json::json!({
                    "index": index,
                    "url": url,
                    "host": host,
                }))
            }
            Error::Validation(ValidationError::UnknownService { name }) => {
                Some(serde_json::json!({ "service": name }))
            }
            Error::PayloadTooLarge { limit } => Some(serde_json::json!({ "limit_bytes": limit })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
