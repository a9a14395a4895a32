//! Folding per-URL delivery outcomes into per-service results
//!
//! A service is reported successful only if it accepted every URL. When it
//! accepted some URLs and failed others, the result is a failure with a
//! partial-failure message, whatever order the outcomes arrived in.

use std::time::Duration;

use crate::types::{DeliveryOutcome, PingMethod, PingReport, ServiceReport};

#[derive(Debug)]
struct ServiceTally {
    service: String,
    method: PingMethod,
    succeeded: usize,
    failed: usize,
    elapsed: Duration,
    first_success: Option<String>,
    first_failure: Option<(String, Option<String>)>,
    retry_after: Option<u64>,
}

impl ServiceTally {
    fn new(service: &str, method: PingMethod) -> Self {
        Self {
            service: service.to_string(),
            method,
            succeeded: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            first_success: None,
            first_failure: None,
            retry_after: None,
        }
    }

    fn record(&mut self, outcome: DeliveryOutcome) {
        self.elapsed += outcome.elapsed;
        if let Some(hint) = outcome.retry_after {
            self.retry_after = Some(self.retry_after.map_or(hint, |h| h.max(hint)));
        }
        if outcome.success {
            self.succeeded += 1;
            self.first_success.get_or_insert(outcome.message);
        } else {
            self.failed += 1;
            self.first_failure.get_or_insert((outcome.message, outcome.error));
        }
    }

    fn into_report(self) -> ServiceReport {
        let total = self.succeeded + self.failed;
        let (success, message, error) = match (self.first_success, self.first_failure) {
            (Some(message), None) => (true, message, None),
            (None, Some((message, error))) => (false, message, error),
            (Some(_), Some((message, error))) => (
                false,
                format!(
                    "Partial failure: {} of {} URLs failed ({})",
                    self.failed, total, message
                ),
                error.or_else(|| Some("partial failure".to_string())),
            ),
            (None, None) => (
                false,
                "No URLs were delivered to this service".to_string(),
                Some("not attempted".to_string()),
            ),
        };

        ServiceReport {
            service: self.service,
            success,
            message,
            method: self.method,
            response_time: self.elapsed.as_millis() as u64,
            error,
            retry_after: self.retry_after,
        }
    }
}

/// Accumulates outcomes for one request and produces the final [`PingReport`]
///
/// Results keep the order the services were registered in, regardless of
/// the order outcomes are recorded.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    tallies: Vec<ServiceTally>,
}

impl ReportBuilder {
    /// Create a builder for the given services, in reporting order
    pub fn new<'a>(services: impl IntoIterator<Item = (&'a str, PingMethod)>) -> Self {
        Self {
            tallies: services
                .into_iter()
                .map(|(name, method)| ServiceTally::new(name, method))
                .collect(),
        }
    }

    /// Fold one outcome into its service's tally
    pub fn record(&mut self, outcome: DeliveryOutcome) {
        match self.tallies.iter_mut().find(|t| t.service == outcome.service) {
            Some(tally) => tally.record(outcome),
            None => {
                let mut tally = ServiceTally::new(&outcome.service, outcome.method);
                tally.record(outcome);
                self.tallies.push(tally);
            }
        }
    }

    /// Fold every outcome in `outcomes`
    pub fn record_all(&mut self, outcomes: impl IntoIterator<Item = DeliveryOutcome>) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    /// Produce the final report
    ///
    /// Overall success is true when any service accepted any URL.
    pub fn finish(self, total_time: Duration, feed_url: Option<String>) -> PingReport {
        let success = self.tallies.iter().any(|t| t.succeeded > 0);
        PingReport {
            success,
            results: self
                .tallies
                .into_iter()
                .map(ServiceTally::into_report)
                .collect(),
            total_time: total_time.as_millis() as u64,
            feed_url,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(service: &str, success: bool, message: &str, elapsed_ms: u64) -> DeliveryOutcome {
        DeliveryOutcome {
            service: service.to_string(),
            success,
            message: message.to_string(),
            method: PingMethod::XmlRpc,
            elapsed: Duration::from_millis(elapsed_ms),
            attempts: 1,
            error: (!success).then(|| "server error".to_string()),
            retry_after: None,
        }
    }

    fn builder() -> ReportBuilder {
        ReportBuilder::new([("A", PingMethod::XmlRpc), ("B", PingMethod::WebSub)])
    }

    #[test]
    fn success_then_failure_is_partial() {
        let mut report = builder();
        report.record(outcome("A", true, "Thanks", 10));
        report.record(outcome("A", false, "HTTP 500: Internal Server Error", 20));
        report.record(outcome("B", true, "Hub accepted", 5));
        report.record(outcome("B", true, "Hub accepted", 7));

        let report = report.finish(Duration::from_millis(40), None);

        let a = report.service("A").unwrap();
        assert!(!a.success);
        assert!(a.message.starts_with("Partial failure: 1 of 2 URLs failed"));
        assert_eq!(a.error.as_deref(), Some("server error"));
        assert_eq!(a.response_time, 30);

        let b = report.service("B").unwrap();
        assert!(b.success);
        assert_eq!(b.message, "Hub accepted");
        assert_eq!(b.response_time, 12);

        assert!(report.success);
    }

    #[test]
    fn failure_then_success_is_also_partial() {
        let mut report = builder();
        report.record(outcome("A", false, "timed out after 10000ms", 10));
        report.record(outcome("A", true, "Thanks", 10));

        let report = report.finish(Duration::ZERO, None);
        let a = report.service("A").unwrap();
        assert!(!a.success);
        assert!(a.message.contains("Partial failure"));
        assert!(a.message.contains("timed out after 10000ms"));
    }

    #[test]
    fn all_failures_keep_first_message() {
        let mut report = builder();
        report.record(outcome("A", false, "first", 1));
        report.record(outcome("A", false, "second", 1));
        report.record(outcome("B", false, "nope", 1));

        let report = report.finish(Duration::ZERO, None);
        assert_eq!(report.service("A").unwrap().message, "first");
        assert!(!report.success, "no service succeeded for any URL");
    }

    #[test]
    fn results_keep_registration_order() {
        let mut report = builder();
        report.record(outcome("B", true, "ok", 1));
        report.record(outcome("A", true, "ok", 1));

        let report = report.finish(Duration::ZERO, Some("https://x/feed".into()));
        let names: Vec<_> = report.results.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(report.feed_url.as_deref(), Some("https://x/feed"));
    }

    #[test]
    fn largest_retry_hint_wins() {
        let mut report = builder();
        let mut first = outcome("A", false, "rate limited", 1);
        first.retry_after = Some(30);
        let mut second = outcome("A", false, "rate limited", 1);
        second.retry_after = Some(90);
        report.record_all([first, second]);

        let report = report.finish(Duration::ZERO, None);
        assert_eq!(report.service("A").unwrap().retry_after, Some(90));
    }

    #[test]
    fn any_success_makes_overall_success() {
        let mut report = builder();
        report.record(outcome("A", false, "down", 1));
        report.record(outcome("B", true, "ok", 1));
        report.record(outcome("B", false, "down", 1));

        let report = report.finish(Duration::ZERO, None);
        assert!(report.success);
        assert!(!report.service("A").unwrap().success);
        assert!(!report.service("B").unwrap().success);
    }
}
