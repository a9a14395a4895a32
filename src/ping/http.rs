//! HTTP status classification shared by both wire protocols

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;

use crate::error::DeliveryError;

/// User-Agent sent with every outbound ping
pub(crate) const USER_AGENT: &str = concat!("pingcast/", env!("CARGO_PKG_VERSION"));

/// Retry hint used when a rate-limit response carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Longest error body echoed into a failure message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Pass 2xx responses through and turn everything else into a [`DeliveryError`]
///
/// - 429 and 503 become [`DeliveryError::RateLimited`] with the parsed hint
/// - other 5xx become [`DeliveryError::Server`]
/// - other 4xx (and anything unexpected) become [`DeliveryError::Rejected`]
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        let header = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let retry_after_secs = parse_retry_after(header.as_deref(), Utc::now());
        let message = error_message(response, status).await;
        return Err(DeliveryError::RateLimited {
            status: status.as_u16(),
            retry_after_secs,
            message,
        });
    }

    let message = error_message(response, status).await;
    if status.is_server_error() {
        Err(DeliveryError::Server {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Interpret a `Retry-After` header value as a non-negative number of seconds
///
/// Accepts either a delay in seconds or an HTTP date. Dates in the past yield
/// zero. Missing or unparseable values fall back to [`DEFAULT_RETRY_AFTER_SECS`].
pub fn parse_retry_after(value: Option<&str>, now: DateTime<Utc>) -> u64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_RETRY_AFTER_SECS;
    };

    if let Ok(secs) = value.parse::<u64>() {
        return secs;
    }

    match DateTime::parse_from_rfc2822(value) {
        Ok(date) => {
            let delta = date.with_timezone(&Utc) - now;
            delta.num_seconds().max(0) as u64
        }
        Err(_) => DEFAULT_RETRY_AFTER_SECS,
    }
}

/// Textual error from the response body, or `HTTP <code>: <reason>`
async fn error_message(response: reqwest::Response, status: StatusCode) -> String {
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        );
    }

    let mut message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        message.push_str("...");
    }
    message
}
