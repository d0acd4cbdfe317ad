//! Threshold rule definitions and evaluation
//!
//! A rule names one sample field and a comparison against one or two
//! thresholds. Evaluation is pure: the only state a rule carries beyond its
//! definition is the `last_triggered` timestamp, which the alert manager
//! updates when the rule fires.

use crate::telemetry::{fields, Sample, Severity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator applied to a sample field value
///
/// `Between` is inclusive on both bounds; `Outside` is strict. A missing or
/// `NaN` field value never satisfies any comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan { threshold: f64 },
    LessThan { threshold: f64 },
    Equal { threshold: f64 },
    NotEqual { threshold: f64 },
    Between { min: f64, max: f64 },
    Outside { min: f64, max: f64 },
}

impl Comparison {
    /// Whether `value` satisfies this comparison
    pub fn matches(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match *self {
            Comparison::GreaterThan { threshold } => value > threshold,
            Comparison::LessThan { threshold } => value < threshold,
            Comparison::Equal { threshold } => value == threshold,
            Comparison::NotEqual { threshold } => value != threshold,
            Comparison::Between { min, max } => min <= value && value <= max,
            Comparison::Outside { min, max } => value < min || value > max,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Comparison::GreaterThan { threshold } => write!(f, "> {}", threshold),
            Comparison::LessThan { threshold } => write!(f, "< {}", threshold),
            Comparison::Equal { threshold } => write!(f, "== {}", threshold),
            Comparison::NotEqual { threshold } => write!(f, "!= {}", threshold),
            Comparison::Between { min, max } => write!(f, "in [{}, {}]", min, max),
            Comparison::Outside { min, max } => write!(f, "outside [{}, {}]", min, max),
        }
    }
}

/// A named threshold condition over one sample field
///
/// Immutable once created except for `enabled` and `last_triggered`, which
/// the alert manager mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule identifier, unique within a rule set
    pub id: String,
    /// Sample field this rule evaluates
    pub field: String,
    /// Comparison applied to the field value
    pub comparison: Comparison,
    /// Severity of alerts produced by this rule
    pub severity: Severity,
    /// Human-readable message attached to alerts
    pub message: String,
    /// Whether the rule participates in evaluation
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// When this rule last fired, if ever
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_triggered: Option<Timestamp>,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// Create an enabled rule with no trigger history
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        comparison: Comparison,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            comparison,
            severity,
            message: message.into(),
            enabled: true,
            last_triggered: None,
        }
    }

    /// Evaluate this rule against a sample
    ///
    /// Returns the observed field value when the rule's condition is
    /// satisfied. Disabled rules and samples with a missing or `NaN` field
    /// value short-circuit to no match.
    pub fn evaluate(&self, sample: &Sample) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        let value = sample.value(&self.field)?;
        self.comparison.matches(value).then_some(value)
    }

    /// Seed rules installed by default for wearable vitals
    ///
    /// These are configuration data, not hardcoded logic: arbitrary
    /// additional rules with the same shape can be added alongside or in
    /// place of them.
    pub fn default_rules() -> Vec<AlertRule> {
        vec![
            AlertRule::new(
                "heart-rate-high",
                fields::HEART_RATE,
                Comparison::GreaterThan { threshold: 120.0 },
                Severity::Warning,
                "Heart rate elevated",
            ),
            AlertRule::new(
                "heart-rate-critical",
                fields::HEART_RATE,
                Comparison::GreaterThan { threshold: 150.0 },
                Severity::Critical,
                "Heart rate critically high",
            ),
            AlertRule::new(
                "skin-conductance-high",
                fields::SKIN_CONDUCTANCE,
                Comparison::GreaterThan { threshold: 0.8 },
                Severity::Warning,
                "Skin conductance elevated",
            ),
            AlertRule::new(
                "temperature-high",
                fields::BODY_TEMPERATURE,
                Comparison::GreaterThan { threshold: 38.0 },
                Severity::Warning,
                "Body temperature elevated",
            ),
        ]
    }
}
