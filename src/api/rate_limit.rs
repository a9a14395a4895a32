//! Rate limiting middleware for `POST /ping`
//!
//! Per-IP token buckets. The limiter is built once per router and handed to
//! the middleware as state.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// How often idle buckets are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Idle time after which a bucket is dropped when its rate never refills it
const MAX_IDLE: Duration = Duration::from_secs(3600);

/// Simple token bucket rate limiter
struct TokenBucket {
    /// Available tokens
    tokens: f64,
    /// Last refill time
    last_refill: Instant,
    /// Tokens per second
    rate: f64,
    /// Maximum burst size
    capacity: u32,
}

impl TokenBucket {
    fn new(rate: f64, capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Take a token, or return the seconds until one is available
    fn try_consume(&mut self, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else if self.rate <= 0.0 {
            Some(60)
        } else {
            let wait_secs = ((1.0 - self.tokens) / self.rate).ceil() as u64;
            Some(wait_secs.max(1))
        }
    }
}

/// Buckets plus the time of the last idle sweep
struct Buckets {
    by_ip: HashMap<IpAddr, TokenBucket>,
    last_sweep: Instant,
}

/// Rate limiter with per-IP tracking
///
/// Buckets idle long enough to have refilled completely are indistinguishable
/// from fresh ones and are swept periodically.
pub struct RateLimiter {
    /// Per-IP token buckets
    buckets: Mutex<Buckets>,
    /// Idle time after which a bucket is full again
    idle_window: Duration,
    /// Configuration
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        let rate = config.requests_per_minute as f64 / 60.0;
        let capacity = config.burst_size.max(1) as f64;
        let idle_window = if rate > 0.0 {
            Duration::from_secs_f64(capacity / rate).min(MAX_IDLE)
        } else {
            MAX_IDLE
        };

        Self {
            buckets: Mutex::new(Buckets {
                by_ip: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            idle_window,
            config,
        }
    }

    /// Check whether `ip` may make another request
    ///
    /// Returns `Some(seconds)` to wait when the request should be refused.
    pub async fn check(&self, ip: IpAddr) -> Option<u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Option<u64> {
        if self.config.exempt_ips.contains(&ip) {
            return None;
        }

        let mut buckets = self.buckets.lock().await;
        if now.saturating_duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            let before = buckets.by_ip.len();
            buckets
                .by_ip
                .retain(|_, b| now.saturating_duration_since(b.last_refill) < self.idle_window);
            buckets.last_sweep = now;
            tracing::debug!(
                removed = before - buckets.by_ip.len(),
                remaining = buckets.by_ip.len(),
                "swept idle rate limit buckets"
            );
        }

        let bucket = buckets.by_ip.entry(ip).or_insert_with(|| {
            TokenBucket::new(
                self.config.requests_per_minute as f64 / 60.0,
                self.config.burst_size.max(1),
            )
        });
        bucket.try_consume(now)
    }
}

/// Rate limiting middleware function
///
/// Requests without connection info share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(ip).await {
        None => next.run(req).await,
        Some(retry_after) => {
            tracing::warn!(ip = %ip, retry_after, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after.to_string())],
                Json(ApiError::rate_limited(retry_after)),
            )
                .into_response()
        }
    }
}
