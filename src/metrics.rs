//! Operation metrics: success counters, running mean latency and a health score.
//!
//! ```text
//! avg'       = (avg × (n − 1) + secs) / n
//! efficiency = 1 / (avg + 0.1)
//! health     = min(0.6 × success_rate + 0.4 × efficiency, 1)
//! ```
//!
//! The health score is refreshed every `health_check_interval` operations and
//! on demand through [`OperationMetrics::refresh_health`].

use serde::{Deserialize, Serialize};

/// Latency guard added before inverting the mean processing time.
const EFFICIENCY_EPSILON: f64 = 0.1;

/// Counters for every operation a [`Session`](crate::session::Session) runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationMetrics {
    /// Operations attempted.
    pub total_operations: u64,
    /// Operations that returned `Ok`.
    pub successful_operations: u64,
    /// Operations that returned `Err`.
    pub failed_operations: u64,
    /// Running mean of processing time, seconds.
    pub average_processing_secs: f64,
    /// Last computed health score in [0, 1].
    pub health_score: f64,
    /// Unix timestamp (seconds) of the last health refresh.
    pub last_health_check: i64,
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self {
            total_operations: 0,
            successful_operations: 0,
            failed_operations: 0,
            average_processing_secs: 0.0,
            health_score: 1.0,
            last_health_check: chrono::Utc::now().timestamp(),
        }
    }
}

impl OperationMetrics {
    /// Fresh counters with a perfect health score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one operation that took `secs` seconds.
    ///
    /// Every `health_check_interval` operations the health score is refreshed.
    /// An interval of 0 disables the periodic refresh.
    pub fn record(&mut self, success: bool, secs: f64, health_check_interval: u64) {
        self.total_operations += 1;
        if success {
            self.successful_operations += 1;
        } else {
            self.failed_operations += 1;
        }
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        let n = self.total_operations as f64;
        self.average_processing_secs = (self.average_processing_secs * (n - 1.0) + secs) / n;

        if health_check_interval > 0 && self.total_operations % health_check_interval == 0 {
            self.refresh_health();
        }
    }

    /// Share of operations that succeeded; 1.0 before any operation.
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 1.0;
        }
        self.successful_operations as f64 / self.total_operations as f64
    }

    /// Recompute and store the health score.
    pub fn refresh_health(&mut self) -> f64 {
        let efficiency = 1.0 / (self.average_processing_secs + EFFICIENCY_EPSILON);
        self.health_score = (0.6 * self.success_rate() + 0.4 * efficiency).min(1.0);
        self.last_health_check = chrono::Utc::now().timestamp();
        self.health_score
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
