//! Telemetry transport boundary
//!
//! The core receives pushed data through a uniform shape regardless of the
//! underlying technology: a subscribe function that takes a callback and
//! returns a disposer. Implementations are selected once at composition
//! time; the core never branches on which transport is behind the trait.

pub mod simulated;

use crate::subscriptions::Disposer;
use crate::telemetry::{DeviceStatus, SensorPayload};

pub use simulated::SimulatedSource;

/// Callback invoked for each sensor sample pushed by the transport
pub type SensorCallback = Box<dyn Fn(SensorPayload) + Send>;

/// Callback invoked for each device status update pushed by the transport
pub type StatusCallback = Box<dyn Fn(DeviceStatus) + Send>;

/// A push-data source for per-device telemetry
///
/// Each subscribe call performs one upstream registration and returns the
/// disposer that tears it down. Transport-level failures (reconnects,
/// timeouts) are the implementation's concern; the core only tracks
/// disposers through the [`crate::subscriptions::SubscriptionRegistry`].
pub trait TelemetrySource: Send {
    /// Subscribe to the sensor sample stream of one device
    fn subscribe_sensor_data(&self, device_id: &str, callback: SensorCallback) -> Disposer;

    /// Subscribe to device status updates for all devices
    fn subscribe_device_status(&self, callback: StatusCallback) -> Disposer;
}
