//! Core telemetry types for the wearable monitoring core
//!
//! This module defines the fundamental data structures used throughout the
//! crate for representing sensor samples, device status payloads, and the
//! enums shared by the aggregation and alerting subsystems.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timestamp type for consistent time handling across the crate
///
/// On the wire timestamps are integer milliseconds since the Unix epoch;
/// internally they are `chrono` UTC datetimes.
pub type Timestamp = DateTime<Utc>;

/// Well-known sample field names produced by wearable devices
///
/// Rules and aggregate queries address fields by name, so arbitrary
/// additional fields are allowed; these constants cover the standard sensor
/// payload.
pub mod fields {
    pub const HEART_RATE: &str = "heart_rate";
    pub const SKIN_CONDUCTANCE: &str = "skin_conductance";
    pub const BODY_TEMPERATURE: &str = "body_temperature";
    pub const ACCEL_X: &str = "accel_x";
    pub const ACCEL_Y: &str = "accel_y";
    pub const ACCEL_Z: &str = "accel_z";
}

/// One timestamped set of sensor field readings
///
/// A sample is a mapping from field name to numeric value plus a timestamp.
/// Timestamps are not assumed to be monotonically non-decreasing: streams
/// keep samples in arrival order, and out-of-order timestamps are tolerated.
/// `NaN` values are treated as "not a valid reading" and are excluded from
/// aggregates and rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the sample was taken
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    /// Field name to numeric value
    pub fields: HashMap<String, f64>,
}

impl Sample {
    /// Create a sample with the given fields, timestamped now
    pub fn new(fields: HashMap<String, f64>) -> Self {
        Self::at(Utc::now(), fields)
    }

    /// Create a sample with the given fields at an explicit timestamp
    pub fn at(timestamp: Timestamp, fields: HashMap<String, f64>) -> Self {
        Self { timestamp, fields }
    }

    /// Look up a field value, treating `NaN` as absent
    ///
    /// Returns `None` for missing fields and for fields holding `NaN`, which
    /// is the "malformed reading" representation on a numeric map. Callers
    /// never see an error for malformed fields; they simply see no value.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied().filter(|v| !v.is_nan())
    }
}

/// Sensor data payload pushed by the telemetry transport
///
/// Matches the wire shape emitted per device: fixed vital-sign fields plus a
/// three-axis accelerometer reading and a millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    pub heart_rate: f64,
    pub skin_conductance: f64,
    pub body_temperature: f64,
    pub accelerometer: AccelReading,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
}

/// Three-axis accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<SensorPayload> for Sample {
    /// Flatten a wire payload into a generic sample
    ///
    /// The accelerometer vector is flattened to `accel_x`/`accel_y`/`accel_z`
    /// so that threshold rules can address individual axes.
    fn from(payload: SensorPayload) -> Self {
        let mut fields = HashMap::with_capacity(6);
        fields.insert(fields::HEART_RATE.to_string(), payload.heart_rate);
        fields.insert(
            fields::SKIN_CONDUCTANCE.to_string(),
            payload.skin_conductance,
        );
        fields.insert(
            fields::BODY_TEMPERATURE.to_string(),
            payload.body_temperature,
        );
        fields.insert(fields::ACCEL_X.to_string(), payload.accelerometer.x);
        fields.insert(fields::ACCEL_Y.to_string(), payload.accelerometer.y);
        fields.insert(fields::ACCEL_Z.to_string(), payload.accelerometer.z);
        Sample::at(payload.timestamp, fields)
    }
}

/// Connectivity state reported in device status payloads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Online,
    Offline,
}

/// Device status payload pushed by the telemetry transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Device identifier
    pub id: String,
    /// Current connectivity state
    pub status: ConnectivityState,
    /// Battery level, 0-100
    pub battery_level: f64,
    /// When the device was last seen
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: Timestamp,
    /// User currently assigned to this device, if any
    pub assigned_user_id: Option<String>,
}

/// Severity level for threshold alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Warning that may require attention
    Warning,
    /// Critical issue requiring immediate attention
    Critical,
}

/// Coarse trend classification over a recent window of one field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Convert a millisecond epoch timestamp into a [`Timestamp`]
///
/// Out-of-range values (beyond what `chrono` can represent) fall back to the
/// epoch rather than panicking; such timestamps cannot be produced by a real
/// device clock.
pub fn timestamp_from_millis(millis: i64) -> Timestamp {
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(ts) => ts,
        _ => Utc.timestamp_millis_opt(0).unwrap(),
    }
}
