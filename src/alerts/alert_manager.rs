//! Alert lifecycle management
//!
//! The [`AlertManager`] owns the rule set, evaluates incoming samples against
//! every enabled rule, and tracks the resulting alerts through their
//! lifecycle: open, acknowledged, cleared. A bounded history keeps the most
//! recent alerts for inspection after they leave the active set.

use crate::alerts::rules::AlertRule;
use crate::telemetry::{Sample, Severity, Timestamp};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Default maximum number of history entries retained
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Default number of entries returned by [`AlertManager::alert_history`]
pub const DEFAULT_HISTORY_QUERY: usize = 50;

/// When a rule fires relative to its condition
///
/// `Level` fires on every satisfying sample, so a device staying above a
/// threshold produces one alert per sample. `Edge` fires only when the
/// condition transitions from not satisfied to satisfied for a given
/// (rule, device) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FiringMode {
    #[default]
    Level,
    Edge,
}

/// A single triggered alert
///
/// The active-set copy of an alert is mutated by acknowledgment; the history
/// copy is never mutated after insertion, so the two records can diverge once
/// an alert is acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id: rule id + trigger time + sequence number
    pub id: String,
    /// Rule that produced this alert
    pub rule_id: String,
    /// Device/stream the triggering sample came from
    pub device_id: String,
    /// Severity copied from the rule at trigger time
    pub severity: Severity,
    /// Message copied from the rule at trigger time
    pub message: String,
    /// Observed field value that satisfied the rule
    pub value: f64,
    /// Human-readable description of the rule's threshold
    pub threshold: String,
    /// When the alert was triggered
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    /// Whether the active copy has been acknowledged
    pub acknowledged: bool,
    /// When the active copy was acknowledged, if it was
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub acknowledged_at: Option<Timestamp>,
}

/// Evaluates samples against threshold rules and tracks alert lifecycle
#[derive(Debug)]
pub struct AlertManager {
    rules: HashMap<String, AlertRule>,
    active: HashMap<String, Alert>,
    history: VecDeque<Alert>,
    history_limit: usize,
    firing_mode: FiringMode,
    /// (rule id, device id) pairs whose condition held on the last sample;
    /// only consulted in edge mode
    satisfied: HashSet<(String, String)>,
    /// Monotonic counter folded into alert ids so that two triggers within
    /// the same millisecond still get distinct ids
    sequence: u64,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(FiringMode::Level, DEFAULT_HISTORY_LIMIT)
    }
}

impl AlertManager {
    /// Create a manager with no rules
    ///
    /// # Arguments
    ///
    /// * `firing_mode` - Level- or edge-triggered rule firing
    /// * `history_limit` - Maximum number of history entries retained
    pub fn new(firing_mode: FiringMode, history_limit: usize) -> Self {
        Self {
            rules: HashMap::new(),
            active: HashMap::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            firing_mode,
            satisfied: HashSet::new(),
            sequence: 0,
        }
    }

    /// Create a manager pre-seeded with the default wearable vitals rules
    pub fn with_default_rules() -> Self {
        let mut manager = Self::default();
        for rule in AlertRule::default_rules() {
            manager.add_rule(rule);
        }
        manager
    }

    /// Insert or replace a rule
    pub fn add_rule(&mut self, rule: AlertRule) {
        debug!(
            "Installing alert rule '{}' on field '{}'",
            rule.id, rule.field
        );
        self.rules.insert(rule.id.clone(), rule);
    }

    /// Remove a rule and every active alert that references it
    ///
    /// Matching is by rule id, not alert id; history entries are untouched.
    /// Unknown rule ids are a no-op.
    pub fn remove_rule(&mut self, rule_id: &str) {
        if self.rules.remove(rule_id).is_some() {
            info!("Removed alert rule '{}'", rule_id);
        }
        self.active.retain(|_, alert| alert.rule_id != rule_id);
        self.satisfied.retain(|(rid, _)| rid != rule_id);
    }

    /// Enable or disable a rule; unknown ids are a no-op
    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) {
        if let Some(rule) = self.rules.get_mut(rule_id) {
            rule.enabled = enabled;
        }
    }

    /// Look up a rule by id
    pub fn rule(&self, rule_id: &str) -> Option<&AlertRule> {
        self.rules.get(rule_id)
    }

    /// All installed rules, in no particular order
    pub fn rules(&self) -> Vec<&AlertRule> {
        self.rules.values().collect()
    }

    /// Evaluate a sample against every enabled rule
    ///
    /// Each rule whose condition fires produces a new [`Alert`] that is
    /// inserted into the active set, appended to the bounded history, and
    /// reflected in the rule's `last_triggered` timestamp. The return value
    /// contains only the alerts newly triggered by this call, not the full
    /// active set; it is empty when nothing fired.
    pub fn check_alerts(&mut self, device_id: &str, sample: &Sample) -> Vec<Alert> {
        let mut triggered = Vec::new();
        let now = Utc::now();

        let mut rule_ids: Vec<String> = self.rules.keys().cloned().collect();
        // Deterministic evaluation order keeps multi-rule triggers stable
        rule_ids.sort();

        for rule_id in rule_ids {
            let Some(rule) = self.rules.get(&rule_id) else {
                continue;
            };
            let matched = rule.evaluate(sample);
            let state_key = (rule_id.clone(), device_id.to_string());

            let fire = match (self.firing_mode, matched) {
                (FiringMode::Level, Some(_)) => true,
                // Edge mode only fires on the not-satisfied -> satisfied
                // transition for this (rule, device) pair
                (FiringMode::Edge, Some(_)) => !self.satisfied.contains(&state_key),
                (_, None) => false,
            };

            match matched {
                Some(_) => {
                    self.satisfied.insert(state_key);
                }
                None => {
                    self.satisfied.remove(&state_key);
                }
            }

            let Some(value) = matched else {
                continue;
            };
            if !fire {
                continue;
            }

            self.sequence += 1;
            let alert = Alert {
                id: format!("{}-{}-{}", rule_id, now.timestamp_millis(), self.sequence),
                rule_id: rule_id.clone(),
                device_id: device_id.to_string(),
                severity: rule.severity,
                message: rule.message.clone(),
                value,
                threshold: rule.comparison.to_string(),
                timestamp: now,
                acknowledged: false,
                acknowledged_at: None,
            };

            match alert.severity {
                Severity::Critical => warn!(
                    "Alert '{}' on device '{}': {} (value {}, threshold {})",
                    alert.id, device_id, alert.message, alert.value, alert.threshold
                ),
                Severity::Warning => info!(
                    "Alert '{}' on device '{}': {} (value {}, threshold {})",
                    alert.id, device_id, alert.message, alert.value, alert.threshold
                ),
            }

            if let Some(rule) = self.rules.get_mut(&rule_id) {
                rule.last_triggered = Some(now);
            }
            self.active.insert(alert.id.clone(), alert.clone());
            self.push_history(alert.clone());
            triggered.push(alert);
        }

        triggered
    }

    /// Mark the active copy of an alert acknowledged
    ///
    /// Only the active-set record is mutated; the history record inserted at
    /// trigger time keeps `acknowledged = false`. Unknown ids are a no-op
    /// and return `false`.
    pub fn acknowledge(&mut self, alert_id: &str) -> bool {
        match self.active.get_mut(alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                alert.acknowledged_at = Some(Utc::now());
                debug!("Acknowledged alert '{}'", alert_id);
                true
            }
            None => false,
        }
    }

    /// Remove every acknowledged alert from the active set
    ///
    /// Unacknowledged alerts stay active and history is untouched.
    pub fn clear_acknowledged(&mut self) {
        let before = self.active.len();
        self.active.retain(|_, alert| !alert.acknowledged);
        let cleared = before - self.active.len();
        if cleared > 0 {
            info!("Cleared {} acknowledged alerts", cleared);
        }
    }

    /// All alerts currently in the active set
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.active.values().cloned().collect()
    }

    /// The most recent `limit` history entries, most recent first
    pub fn alert_history(&self, limit: usize) -> Vec<Alert> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Number of history entries currently retained
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn push_history(&mut self, alert: Alert) {
        self.history.push_back(alert);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::alerts::rules::Comparison;
    use crate::telemetry::fields;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use std::collections::{HashMap, HashSet};

    fn hr_sample(hr: f64) -> Sample {
        let mut f = HashMap::new();
        f.insert(fields::HEART_RATE.to_string(), hr);
        Sample::new(f)
    }

    fn hr_high_rule() -> AlertRule {
        AlertRule::new(
            "hr-high",
            fields::HEART_RATE,
            Comparison::GreaterThan { threshold: 120.0 },
            Severity::Warning,
            "Heart rate elevated",
        )
    }

    /// Generate a bounded sequence of heart-rate readings around the 120 bpm
    /// threshold so that both firing and non-firing samples occur
    #[derive(Debug, Clone)]
    struct HeartRates(Vec<f64>);

    impl Arbitrary for HeartRates {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 60;
            let rates = (0..len)
                .map(|_| 60.0 + (u8::arbitrary(g) % 120) as f64)
                .collect();
            HeartRates(rates)
        }
    }

    #[quickcheck]
    fn prop_alert_ids_are_unique(rates: HeartRates) -> bool {
        let mut manager = AlertManager::default();
        manager.add_rule(hr_high_rule());

        let mut seen = HashSet::new();
        for &hr in &rates.0 {
            for alert in manager.check_alerts("D1", &hr_sample(hr)) {
                if !seen.insert(alert.id) {
                    return false;
                }
            }
        }
        true
    }

    #[quickcheck]
    fn prop_history_never_exceeds_limit(rates: HeartRates, limit: u8) -> bool {
        let limit = (limit % 20 + 1) as usize;
        let mut manager = AlertManager::new(FiringMode::Level, limit);
        manager.add_rule(hr_high_rule());

        for &hr in &rates.0 {
            manager.check_alerts("D1", &hr_sample(hr));
        }
        manager.history_len() <= limit
    }

    #[quickcheck]
    fn prop_level_mode_fires_exactly_on_satisfying_samples(rates: HeartRates) -> bool {
        let mut manager = AlertManager::default();
        manager.add_rule(hr_high_rule());

        let expected = rates.0.iter().filter(|&&hr| hr > 120.0).count();
        let mut fired = 0;
        for &hr in &rates.0 {
            fired += manager.check_alerts("D1", &hr_sample(hr)).len();
        }
        fired == expected
    }

    #[quickcheck]
    fn prop_edge_mode_fires_once_per_transition(rates: HeartRates) -> bool {
        let mut manager = AlertManager::new(FiringMode::Edge, DEFAULT_HISTORY_LIMIT);
        manager.add_rule(hr_high_rule());

        let mut expected = 0;
        let mut was_satisfied = false;
        for &hr in &rates.0 {
            let satisfied = hr > 120.0;
            if satisfied && !was_satisfied {
                expected += 1;
            }
            was_satisfied = satisfied;
        }

        let mut fired = 0;
        for &hr in &rates.0 {
            fired += manager.check_alerts("D1", &hr_sample(hr)).len();
        }
        fired == expected
    }
}
