//! Timer-pair latency sampling per named operation
//!
//! The [`PerformanceMonitor`] tracks how long named operations take:
//! `start_timer` records a start instant, `end_timer` turns it into a metric
//! with a bounded per-operation history and summary statistics on demand.

use crate::telemetry::Timestamp;
use chrono::Utc;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Instant;

/// Maximum number of metric records retained per operation id
pub const MAX_SAMPLES_PER_OPERATION: usize = 100;

/// One completed timing measurement
#[derive(Debug, Clone, Serialize)]
pub struct PerfMetric {
    /// Elapsed duration in milliseconds
    pub duration_ms: f64,
    /// When the measurement completed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    /// Caller-supplied context attached at `end_timer` time
    pub metadata: Option<serde_json::Value>,
}

/// Summary statistics over the retained history of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfStats {
    /// Number of retained samples
    pub count: usize,
    /// Mean duration in milliseconds
    pub average_ms: f64,
    /// Minimum duration in milliseconds
    pub min_ms: f64,
    /// Maximum duration in milliseconds
    pub max_ms: f64,
    /// Most recent duration in milliseconds
    pub last_ms: f64,
}

/// Latency sampler with bounded per-operation history
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    /// Open timers keyed by operation id
    started: HashMap<String, Instant>,
    /// Completed measurements keyed by operation id, oldest first
    metrics: HashMap<String, VecDeque<PerfMetric>>,
}

impl PerformanceMonitor {
    /// Create a monitor with no recorded metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of an operation
    ///
    /// Calling `start_timer` again with the same id before the matching
    /// `end_timer` overwrites the earlier start time; that earlier timing is
    /// lost. This is a known simplification: there is at most one open timer
    /// per operation id.
    pub fn start_timer(&mut self, operation_id: &str) {
        self.started.insert(operation_id.to_string(), Instant::now());
    }

    /// Complete an operation's timer and record the measurement
    ///
    /// Returns the recorded metric, or `None` when no matching `start_timer`
    /// was seen. The per-operation history is bounded; the oldest records
    /// are dropped once the bound is exceeded.
    pub fn end_timer(
        &mut self,
        operation_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> Option<PerfMetric> {
        let start = self.started.remove(operation_id)?;
        let metric = PerfMetric {
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            timestamp: Utc::now(),
            metadata,
        };
        debug!(
            "Operation '{}' took {:.3}ms",
            operation_id, metric.duration_ms
        );

        let history = self.metrics.entry(operation_id.to_string()).or_default();
        history.push_back(metric.clone());
        while history.len() > MAX_SAMPLES_PER_OPERATION {
            history.pop_front();
        }
        Some(metric)
    }

    /// Summary statistics for one operation, `None` when nothing is recorded
    pub fn stats(&self, operation_id: &str) -> Option<PerfStats> {
        let history = self.metrics.get(operation_id)?;
        if history.is_empty() {
            return None;
        }

        let durations: Vec<f64> = history.iter().map(|m| m.duration_ms).collect();
        let count = durations.len();
        let sum: f64 = durations.iter().sum();
        let min = durations.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = durations.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Some(PerfStats {
            count,
            average_ms: sum / count as f64,
            min_ms: min,
            max_ms: max,
            last_ms: *durations.last().unwrap_or(&0.0),
        })
    }

    /// Summary statistics for every operation with recorded metrics
    pub fn all_stats(&self) -> HashMap<String, PerfStats> {
        self.metrics
            .keys()
            .filter_map(|op| self.stats(op).map(|s| (op.clone(), s)))
            .collect()
    }

    /// Number of retained samples for one operation
    pub fn sample_count(&self, operation_id: &str) -> usize {
        self.metrics.get(operation_id).map_or(0, |h| h.len())
    }
}
