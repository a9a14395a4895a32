//! Batch orchestrator for ping requests
//!
//! URLs are processed in fixed-size batches. Batches run one after another;
//! the URLs inside a batch, and the services for each URL, run concurrently.
//! Before each batch and each URL the execution budget is checked, and work
//! that can no longer finish in time is reported as skipped instead of
//! started.

use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use url::Url;

use crate::aggregate::ReportBuilder;
use crate::budget::ExecutionBudget;
use crate::config::{Config, DispatchConfig, RetryConfig, ServiceConfig};
use crate::delivery::deliver;
use crate::error::Result;
use crate::feed::FeedPublisher;
use crate::ping::{PingTransport, build_transport};
use crate::types::{DeliveryOutcome, PingMethod, PingReport, PingTarget, ServiceInfo};
use crate::validation::{select_services, validate_urls};

/// One configured service and the transport that reaches it
struct Endpoint {
    config: ServiceConfig,
    transport: Arc<dyn PingTransport>,
}

/// Fans a ping request out to every selected service
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct PingDispatcher {
    endpoints: Vec<Endpoint>,
    names: Vec<String>,
    retry: RetryConfig,
    dispatch: DispatchConfig,
    feed: FeedPublisher,
}

impl PingDispatcher {
    /// Build a dispatcher with HTTP transports for every configured service
    ///
    /// The configuration is validated first.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()?;

        let services = config
            .services
            .iter()
            .map(|service| (service.clone(), build_transport(service, client.clone())))
            .collect();

        Ok(Self::with_services(config, services))
    }

    /// Build a dispatcher around explicit transports
    ///
    /// `config.services` is ignored; the given services are used in order.
    /// The configuration is not validated, so service names must be unique.
    pub fn with_services(
        config: &Config,
        services: Vec<(ServiceConfig, Arc<dyn PingTransport>)>,
    ) -> Self {
        let endpoints: Vec<Endpoint> = services
            .into_iter()
            .map(|(config, transport)| Endpoint { config, transport })
            .collect();
        let names = endpoints.iter().map(|e| e.config.name.clone()).collect();

        Self {
            endpoints,
            names,
            retry: config.retry.clone(),
            dispatch: config.dispatch.clone(),
            feed: FeedPublisher::from_config(&config.feed),
        }
    }

    /// Public description of every service
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.endpoints
            .iter()
            .map(|e| ServiceInfo::from(&e.config))
            .collect()
    }

    /// Feed publisher used to derive WebSub feed URLs
    pub fn feed(&self) -> &FeedPublisher {
        &self.feed
    }

    /// Maximum URLs accepted per request
    pub fn max_urls(&self) -> usize {
        self.dispatch.max_urls
    }

    /// Validate a raw request and dispatch it
    ///
    /// Validation failures are returned before any network call is made.
    pub async fn ping(&self, raw_urls: &[String], selection: Option<&[String]>) -> Result<PingReport> {
        let urls = validate_urls(raw_urls, self.dispatch.max_urls)?;
        let selected = select_services(&self.names, selection)?;
        let feed_url = self.feed.feed_url(&urls);

        Ok(self.dispatch(&urls, &selected, &feed_url).await)
    }

    /// Deliver already-validated URLs to the selected services
    pub async fn dispatch(&self, urls: &[Url], selected: &[&str], feed_url: &str) -> PingReport {
        let budget = ExecutionBudget::from_config(&self.dispatch);
        let endpoints: Vec<&Endpoint> = self
            .endpoints
            .iter()
            .filter(|e| selected.contains(&e.config.name.as_str()))
            .collect();

        tracing::info!(
            urls = urls.len(),
            services = endpoints.len(),
            feed_url,
            "dispatching ping request"
        );

        let mut report = ReportBuilder::new(
            endpoints
                .iter()
                .map(|e| (e.config.name.as_str(), PingMethod::from(e.config.protocol))),
        );

        for batch in urls.chunks(self.dispatch.batch_size.max(1)) {
            if !budget.allows_new_work() {
                tracing::warn!(
                    skipped_urls = batch.len(),
                    remaining_ms = budget.remaining().as_millis() as u64,
                    "execution budget exhausted, skipping batch"
                );
                for _ in batch {
                    report.record_all(endpoints.iter().map(|e| DeliveryOutcome::skipped(&e.config)));
                }
                continue;
            }

            let per_url = join_all(
                batch
                    .iter()
                    .map(|url| self.deliver_url(url, &endpoints, feed_url, &budget)),
            )
            .await;

            for outcomes in per_url {
                report.record_all(outcomes);
            }
        }

        let report = report.finish(budget.elapsed(), Some(feed_url.to_string()));
        tracing::info!(
            success = report.success,
            total_time_ms = report.total_time,
            "ping request finished"
        );
        report
    }

    /// Deliver one URL to every endpoint concurrently
    async fn deliver_url(
        &self,
        url: &Url,
        endpoints: &[&Endpoint],
        feed_url: &str,
        budget: &ExecutionBudget,
    ) -> Vec<DeliveryOutcome> {
        if !budget.allows_new_work() {
            tracing::warn!(url = %url, "execution budget exhausted, skipping URL");
            return endpoints
                .iter()
                .map(|e| DeliveryOutcome::skipped(&e.config))
                .collect();
        }

        let target = PingTarget::new(url.as_str(), feed_url);
        join_all(endpoints.iter().map(|endpoint| {
            let target = &target;
            async move {
                let delivery = deliver(
                    endpoint.transport.as_ref(),
                    &endpoint.config,
                    &self.retry,
                    target,
                );
                match AssertUnwindSafe(delivery).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        tracing::error!(
                            service = %endpoint.config.name,
                            url = %target.site_url,
                            panic = %panic_message(panic.as_ref()),
                            "delivery panicked"
                        );
                        DeliveryOutcome::internal_failure(&endpoint.config)
                    }
                }
            }
        }))
        .await
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
