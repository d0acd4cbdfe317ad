//! Per-stream aggregation and derived statistics
//!
//! The [`DataAggregator`] owns one [`StreamBuffer`] per stream id (typically
//! a device identifier), creating buffers lazily on first ingestion and
//! computing moving averages and coarse trends over the retained window.

use crate::aggregator::stream_buffer::{StreamBuffer, DEFAULT_CAPACITY};
use crate::telemetry::{Sample, Trend};
use log::debug;
use std::collections::HashMap;

/// Default window size for moving-average queries
pub const DEFAULT_AVERAGE_WINDOW: usize = 10;

/// Default number of samples examined by trend classification
pub const DEFAULT_TREND_LOOKBACK: usize = 5;

/// Percent change beyond which a trend is classified as moving
const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Collection of bounded stream buffers with on-demand statistics
///
/// All queries are pull-based and read-only; ingestion is the only mutation.
/// Unknown stream ids degrade to empty/zero results rather than errors.
#[derive(Debug)]
pub struct DataAggregator {
    streams: HashMap<String, StreamBuffer>,
    capacity: usize,
}

impl Default for DataAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DataAggregator {
    /// Create an aggregator whose streams retain at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            streams: HashMap::new(),
            capacity,
        }
    }

    /// Append a sample to the buffer for `stream_id`
    ///
    /// The buffer is created lazily on first use. Always succeeds; if the
    /// buffer is full the oldest samples are evicted.
    pub fn add_data_point(&mut self, stream_id: &str, sample: Sample) {
        let capacity = self.capacity;
        let buffer = self
            .streams
            .entry(stream_id.to_string())
            .or_insert_with(|| {
                debug!("Creating stream buffer for '{}'", stream_id);
                StreamBuffer::new(capacity)
            });
        buffer.push(sample);
    }

    /// Cloned snapshot of the full sequence for `stream_id`, in arrival order
    ///
    /// Returns an empty vector for unknown ids. Callers get a copy, so the
    /// internal buffer cannot be mutated from outside.
    pub fn data_stream(&self, stream_id: &str) -> Vec<Sample> {
        self.streams
            .get(stream_id)
            .map(|b| b.snapshot())
            .unwrap_or_default()
    }

    /// The most recently appended sample for `stream_id`, if any
    pub fn latest(&self, stream_id: &str) -> Option<Sample> {
        self.streams
            .get(stream_id)
            .and_then(|b| b.latest())
            .cloned()
    }

    /// Arithmetic mean of `field` over the last `window` samples
    ///
    /// Samples where the field is missing or `NaN` are excluded. Returns
    /// `0.0` when no valid values exist — by convention callers treat that
    /// as "no data", not as a measured zero.
    pub fn moving_average(&self, stream_id: &str, field: &str, window: usize) -> f64 {
        let Some(buffer) = self.streams.get(stream_id) else {
            return 0.0;
        };

        let values: Vec<f64> = buffer
            .tail(window)
            .iter()
            .filter_map(|s| s.value(field))
            .collect();

        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Classify the trend of `field` over the last `lookback` samples
    ///
    /// With fewer than `lookback` samples the stream is considered `Stable`.
    /// Otherwise the window is split into a first and second half (floor
    /// split) and the half means are compared: a percent change above +5%
    /// is `Increasing`, below -5% is `Decreasing`, anything else `Stable`.
    ///
    /// When the first-half mean is exactly zero the percent change is
    /// undefined; the classification falls back to `Stable` unless the
    /// second-half mean is non-zero, which is reported as `Increasing`.
    pub fn trend(&self, stream_id: &str, field: &str, lookback: usize) -> Trend {
        let Some(buffer) = self.streams.get(stream_id) else {
            return Trend::Stable;
        };
        if lookback < 2 || buffer.len() < lookback {
            return Trend::Stable;
        }

        let recent = buffer.tail(lookback);
        let split = recent.len() / 2;
        let first_mean = mean_of(&recent[..split], field);
        let second_mean = mean_of(&recent[split..], field);

        let (Some(first), Some(second)) = (first_mean, second_mean) else {
            // Not enough valid readings in one of the halves
            return Trend::Stable;
        };

        if first == 0.0 {
            return if second != 0.0 {
                Trend::Increasing
            } else {
                Trend::Stable
            };
        }

        let change_pct = (second - first) / first * 100.0;
        if change_pct > TREND_THRESHOLD_PCT {
            Trend::Increasing
        } else if change_pct < -TREND_THRESHOLD_PCT {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    /// Remove the buffer for `stream_id`; unknown ids are a no-op
    pub fn clear_stream(&mut self, stream_id: &str) {
        if self.streams.remove(stream_id).is_some() {
            debug!("Cleared stream buffer for '{}'", stream_id);
        }
    }

    /// Remove every stream buffer
    pub fn clear_all(&mut self) {
        debug!("Clearing all {} stream buffers", self.streams.len());
        self.streams.clear();
    }

    /// Ids of the streams currently holding data
    pub fn stream_ids(&self) -> Vec<String> {
        self.streams.keys().cloned().collect()
    }

    /// Number of samples retained for `stream_id`
    pub fn stream_len(&self, stream_id: &str) -> usize {
        self.streams.get(stream_id).map_or(0, |b| b.len())
    }
}

/// Mean of the valid values of `field` over a slice of samples
fn mean_of(samples: &[&Sample], field: &str) -> Option<f64> {
    let values: Vec<f64> = samples.iter().filter_map(|s| s.value(field)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::fields;
    use chrono::Utc;
    use std::collections::HashMap;

    fn hr_sample(hr: f64) -> Sample {
        let mut f = HashMap::new();
        f.insert(fields::HEART_RATE.to_string(), hr);
        Sample::at(Utc::now(), f)
    }

    fn empty_sample() -> Sample {
        Sample::at(Utc::now(), HashMap::new())
    }

    #[test]
    fn test_lazy_stream_creation() {
        let mut aggregator = DataAggregator::default();
        assert!(aggregator.data_stream("D1").is_empty());

        aggregator.add_data_point("D1", hr_sample(70.0));
        assert_eq!(aggregator.data_stream("D1").len(), 1);
        assert_eq!(aggregator.stream_ids(), vec!["D1".to_string()]);
    }

    #[test]
    fn test_latest() {
        let mut aggregator = DataAggregator::default();
        assert!(aggregator.latest("D1").is_none());

        aggregator.add_data_point("D1", hr_sample(70.0));
        aggregator.add_data_point("D1", hr_sample(82.0));
        assert_eq!(
            aggregator.latest("D1").unwrap().value(fields::HEART_RATE),
            Some(82.0)
        );
    }

    #[test]
    fn test_capacity_enforced_per_stream() {
        let mut aggregator = DataAggregator::new(5);
        for i in 0..12 {
            aggregator.add_data_point("D1", hr_sample(i as f64));
        }

        let stream = aggregator.data_stream("D1");
        assert_eq!(stream.len(), 5);
        // Only the most recent five remain, in arrival order
        let values: Vec<f64> = stream
            .iter()
            .map(|s| s.value(fields::HEART_RATE).unwrap())
            .collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_moving_average_basic() {
        let mut aggregator = DataAggregator::default();
        for hr in [60.0, 70.0, 80.0] {
            aggregator.add_data_point("D1", hr_sample(hr));
        }

        let avg = aggregator.moving_average("D1", fields::HEART_RATE, 10);
        assert!((avg - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_moving_average_window_limits() {
        let mut aggregator = DataAggregator::default();
        for hr in [10.0, 20.0, 30.0, 40.0] {
            aggregator.add_data_point("D1", hr_sample(hr));
        }

        // Window of 2 only sees the last two samples
        let avg = aggregator.moving_average("D1", fields::HEART_RATE, 2);
        assert!((avg - 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_moving_average_skips_invalid_values() {
        let mut aggregator = DataAggregator::default();
        aggregator.add_data_point("D1", hr_sample(100.0));
        aggregator.add_data_point("D1", empty_sample());
        let mut nan_fields = HashMap::new();
        nan_fields.insert(fields::HEART_RATE.to_string(), f64::NAN);
        aggregator.add_data_point("D1", Sample::at(Utc::now(), nan_fields));
        aggregator.add_data_point("D1", hr_sample(50.0));

        // Mean of the two valid values only
        let avg = aggregator.moving_average("D1", fields::HEART_RATE, 10);
        assert!((avg - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_moving_average_zero_when_no_valid_values() {
        let mut aggregator = DataAggregator::default();
        assert_eq!(aggregator.moving_average("unknown", "x", 10), 0.0);

        aggregator.add_data_point("D1", empty_sample());
        assert_eq!(aggregator.moving_average("D1", fields::HEART_RATE, 10), 0.0);
    }

    #[test]
    fn test_trend_insufficient_samples() {
        let mut aggregator = DataAggregator::default();
        aggregator.add_data_point("D1", hr_sample(70.0));
        aggregator.add_data_point("D1", hr_sample(90.0));

        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 5),
            Trend::Stable
        );
        assert_eq!(
            aggregator.trend("unknown", fields::HEART_RATE, 5),
            Trend::Stable
        );
    }

    #[test]
    fn test_trend_increasing() {
        let mut aggregator = DataAggregator::default();
        for hr in [60.0, 65.0, 70.0, 75.0, 80.0] {
            aggregator.add_data_point("D1", hr_sample(hr));
        }
        // First half mean 62.5, second half mean 75 -> +20%
        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 5),
            Trend::Increasing
        );
    }

    #[test]
    fn test_trend_decreasing() {
        let mut aggregator = DataAggregator::default();
        for hr in [80.0, 75.0, 70.0, 65.0, 60.0] {
            aggregator.add_data_point("D1", hr_sample(hr));
        }
        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 5),
            Trend::Decreasing
        );
    }

    #[test]
    fn test_trend_stable_on_constant_values() {
        let mut aggregator = DataAggregator::default();
        for _ in 0..5 {
            aggregator.add_data_point("D1", hr_sample(72.0));
        }
        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 5),
            Trend::Stable
        );
    }

    #[test]
    fn test_trend_zero_baseline_fallback() {
        let mut aggregator = DataAggregator::default();
        // First half mean is exactly zero; percent change is undefined
        for v in [0.0, 0.0, 5.0, 5.0, 5.0] {
            aggregator.add_data_point("D1", hr_sample(v));
        }
        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 5),
            Trend::Increasing
        );

        let mut flat = DataAggregator::default();
        for _ in 0..5 {
            flat.add_data_point("D1", hr_sample(0.0));
        }
        assert_eq!(flat.trend("D1", fields::HEART_RATE, 5), Trend::Stable);
    }

    #[test]
    fn test_trend_uses_only_lookback_window() {
        let mut aggregator = DataAggregator::default();
        // Old high values followed by a flat recent window
        for hr in [150.0, 150.0, 150.0, 72.0, 72.0, 72.0, 72.0] {
            aggregator.add_data_point("D1", hr_sample(hr));
        }
        assert_eq!(
            aggregator.trend("D1", fields::HEART_RATE, 4),
            Trend::Stable
        );
    }

    #[test]
    fn test_clear_stream_and_clear_all() {
        let mut aggregator = DataAggregator::default();
        aggregator.add_data_point("D1", hr_sample(70.0));
        aggregator.add_data_point("D2", hr_sample(75.0));

        aggregator.clear_stream("D1");
        assert!(aggregator.data_stream("D1").is_empty());
        assert_eq!(aggregator.data_stream("D2").len(), 1);

        // Unknown ids are a no-op
        aggregator.clear_stream("does-not-exist");

        aggregator.clear_all();
        assert!(aggregator.stream_ids().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut aggregator = DataAggregator::default();
        aggregator.add_data_point("D1", hr_sample(70.0));

        let mut snapshot = aggregator.data_stream("D1");
        snapshot.clear();
        // Internal state is unaffected by mutating the snapshot
        assert_eq!(aggregator.data_stream("D1").len(), 1);
    }
}
