//! Simulated telemetry generator
//!
//! Stands in for the live backend when none is available: each subscription
//! spawns a timer thread that emits a deterministic vital-sign waveform into
//! the callback at a fixed interval. The waveform is seeded from the device
//! id, so different devices produce different but reproducible traces.

use crate::subscriptions::Disposer;
use crate::telemetry::{AccelReading, ConnectivityState, DeviceStatus, SensorPayload};
use crate::transport::{SensorCallback, StatusCallback, TelemetrySource};
use chrono::Utc;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Every `SPIKE_PERIOD`-th tick produces an elevated reading so that the
/// default alert rules fire during a demo run
const SPIKE_PERIOD: u64 = 20;

/// Deterministic waveform generator driven by background timer threads
pub struct SimulatedSource {
    interval: Duration,
    device_ids: Vec<String>,
}

impl SimulatedSource {
    /// Create a simulator emitting one sample per device per `interval`
    ///
    /// # Arguments
    ///
    /// * `interval` - Emission period per subscription
    /// * `device_ids` - Devices reported by the status stream
    pub fn new(interval: Duration, device_ids: Vec<String>) -> Self {
        Self {
            interval,
            device_ids,
        }
    }

    /// Ids of the devices this simulator reports
    pub fn device_ids(&self) -> &[String] {
        &self.device_ids
    }

    fn spawn_loop<F>(&self, label: String, body: F) -> Disposer
    where
        F: FnMut(u64) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let interval = self.interval;
        let mut body = body;

        thread::spawn(move || {
            debug!("Simulated emitter '{}' started", label);
            let mut tick: u64 = 0;
            while flag.load(Ordering::SeqCst) {
                body(tick);
                tick += 1;
                thread::sleep(interval);
            }
            debug!("Simulated emitter '{}' stopped", label);
        });

        Box::new(move || {
            running.store(false, Ordering::SeqCst);
        })
    }
}

impl TelemetrySource for SimulatedSource {
    fn subscribe_sensor_data(&self, device_id: &str, callback: SensorCallback) -> Disposer {
        info!("Simulated sensor stream for device '{}'", device_id);
        let seed = seed_from(device_id);
        self.spawn_loop(format!("sensor-{}", device_id), move |tick| {
            callback(waveform(seed, tick));
        })
    }

    fn subscribe_device_status(&self, callback: StatusCallback) -> Disposer {
        info!("Simulated device status stream");
        let device_ids = self.device_ids.clone();
        self.spawn_loop("device-status".to_string(), move |tick| {
            for (index, id) in device_ids.iter().enumerate() {
                callback(DeviceStatus {
                    id: id.clone(),
                    status: ConnectivityState::Online,
                    battery_level: (100 - (tick + index as u64) % 80) as f64,
                    last_seen: Utc::now(),
                    assigned_user_id: None,
                });
            }
        })
    }
}

/// Stable per-device seed (FNV-1a over the id bytes)
fn seed_from(device_id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in device_id.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Deterministic vital-sign waveform for one device at one tick
///
/// Baseline readings meander inside normal ranges; every [`SPIKE_PERIOD`]-th
/// tick pushes heart rate and temperature over the default rule thresholds.
fn waveform(seed: u64, tick: u64) -> SensorPayload {
    let phase = (seed % 628) as f64 / 100.0;
    let t = tick as f64 * 0.35 + phase;
    let spike = tick > 0 && tick % SPIKE_PERIOD == 0;

    let heart_rate = if spike {
        155.0 + 10.0 * t.sin()
    } else {
        72.0 + 12.0 * t.sin()
    };
    let skin_conductance = if spike {
        0.85 + 0.1 * t.cos().abs()
    } else {
        0.35 + 0.2 * t.cos().abs()
    };
    let body_temperature = if spike {
        38.3 + 0.2 * t.sin().abs()
    } else {
        36.6 + 0.4 * t.sin().abs()
    };

    SensorPayload {
        heart_rate,
        skin_conductance,
        body_temperature,
        accelerometer: AccelReading {
            x: 0.3 * (t * 1.7).sin(),
            y: 0.3 * (t * 2.3).cos(),
            z: 9.81 + 0.1 * t.sin(),
        },
        timestamp: Utc::now(),
    }
}
