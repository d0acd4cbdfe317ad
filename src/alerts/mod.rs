/// Threshold rules and the alert lifecycle manager
pub mod alert_manager;
pub mod rules;

pub use alert_manager::{Alert, AlertManager, FiringMode};
pub use rules::{AlertRule, Comparison};
