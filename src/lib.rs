/// Error types for configuration loading
pub mod error;

/// Telemetry sample and device status types
pub mod telemetry;

/// Per-stream rolling buffers and derived statistics
pub mod aggregator;

/// Threshold rules, alert lifecycle and history
pub mod alerts;

/// Subscription handle registry
pub mod subscriptions;

/// Operation timing instrumentation
pub mod monitoring;

/// Telemetry transport boundary and simulated source
pub mod transport;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use aggregator::{DataAggregator, StreamBuffer};
pub use alerts::{Alert, AlertManager, AlertRule, Comparison, FiringMode};
pub use config::Config;
pub use error::ConfigError;
pub use monitoring::PerformanceMonitor;
pub use subscriptions::{Disposer, SubscriptionRegistry};
pub use telemetry::{Sample, SensorPayload, Severity, Trend};
pub use transport::{SimulatedSource, TelemetrySource};
