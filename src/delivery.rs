//! Per-service delivery unit
//!
//! Turns one transport call into a resilient delivery: every attempt gets its
//! own deadline, transient failures are retried with backoff, and the result
//! is always a [`DeliveryOutcome`], never an error.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::{RetryConfig, ServiceConfig};
use crate::error::DeliveryError;
use crate::ping::PingTransport;
use crate::retry::retry_with_backoff;
use crate::types::{DeliveryOutcome, PingAck, PingTarget};

/// Deliver `target` to one service, retrying transient failures
///
/// Each attempt is cancelled once `service.timeout` elapses, independently of
/// any concurrent delivery. The reported elapsed time is wall clock from the
/// first attempt to the final result, backoff included.
pub async fn deliver(
    transport: &dyn PingTransport,
    service: &ServiceConfig,
    retry: &RetryConfig,
    target: &PingTarget,
) -> DeliveryOutcome {
    let started = Instant::now();
    let timeout = service.timeout;

    let (result, attempts) = retry_with_backoff(retry, service.max_retries, || {
        attempt(transport, target, timeout)
    })
    .await;
    let elapsed = started.elapsed();

    match result {
        Ok(ack) => {
            tracing::debug!(
                service = %service.name,
                url = %target.site_url,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "ping accepted"
            );
            DeliveryOutcome {
                service: service.name.clone(),
                success: true,
                message: ack.message,
                method: transport.method(),
                elapsed,
                attempts,
                error: None,
                retry_after: None,
            }
        }
        Err(e) => {
            tracing::warn!(
                service = %service.name,
                url = %target.site_url,
                attempts,
                error = %e,
                "ping failed"
            );
            let message = if attempts > 1 {
                format!("{e} (after {attempts} attempts)")
            } else {
                e.to_string()
            };
            DeliveryOutcome {
                service: service.name.clone(),
                success: false,
                message,
                method: transport.method(),
                elapsed,
                attempts,
                error: Some(e.reason().to_string()),
                retry_after: e.retry_after(),
            }
        }
    }
}

/// One attempt, cancelled when `timeout` elapses
async fn attempt(
    transport: &dyn PingTransport,
    target: &PingTarget,
    timeout: Duration,
) -> Result<PingAck, DeliveryError> {
    match tokio::time::timeout(timeout, transport.ping(target, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::Timeout { after: timeout }),
    }
}
