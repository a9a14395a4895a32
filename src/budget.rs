//! Execution-time budget for one ping request

use std::time::Duration;
use tokio::time::Instant;

use crate::config::DispatchConfig;

/// Tracks wall-clock time spent on a request against a fixed budget
///
/// New work may only start while more than `safety_margin` of the budget is
/// left. Work already started is never interrupted by the budget; each call
/// is bounded by its own per-attempt timeout instead.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionBudget {
    started: Instant,
    total: Duration,
    safety_margin: Duration,
}

impl ExecutionBudget {
    /// Start the clock now
    pub fn start(total: Duration, safety_margin: Duration) -> Self {
        Self {
            started: Instant::now(),
            total,
            safety_margin,
        }
    }

    /// Start the clock with the limits from `config`
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::start(config.execution_budget, config.safety_margin)
    }

    /// Time since the request started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Budget left, saturating at zero
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    /// Whether there is enough budget left to start new work
    pub fn allows_new_work(&self) -> bool {
        self.remaining() > self.safety_margin
    }
}
