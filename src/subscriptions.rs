//! Subscription lifecycle bookkeeping for push-data sources
//!
//! External sources (device status, sensor data, sessions, alerts) follow a
//! uniform shape: a registration function that takes a callback and returns
//! a disposer. The registry guarantees at most one live upstream
//! subscription per logical key by disposing the previous subscription
//! before installing a replacement.

use log::{debug, info};
use std::collections::HashMap;

/// Cancellation handle returned by an upstream registration function
///
/// Invoking the disposer tears down the upstream subscription. Because
/// disposers are `FnOnce` and are removed from the registry before being
/// invoked, a disposer can never run twice.
pub type Disposer = Box<dyn FnOnce() + Send>;

/// Tracks one disposer per logical subscription key
///
/// The registry does not retry or detect transport failures; its only job is
/// correct disposer bookkeeping.
#[derive(Default)]
pub struct SubscriptionRegistry {
    active: HashMap<String, Disposer>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription under `key`
    ///
    /// `register` performs the upstream registration and returns the
    /// disposer to keep. If a subscription already exists under `key`, its
    /// disposer is invoked exactly once before the new one is installed, so
    /// there is never more than one live upstream subscription per key.
    pub fn subscribe<F>(&mut self, key: impl Into<String>, register: F)
    where
        F: FnOnce() -> Disposer,
    {
        let key = key.into();
        if let Some(previous) = self.active.remove(&key) {
            debug!("Replacing subscription '{}': disposing previous", key);
            previous();
        }
        let disposer = register();
        self.active.insert(key, disposer);
    }

    /// Dispose and discard the subscription under `key`
    ///
    /// Unknown keys are a no-op and return `false`; calling again after a
    /// successful unsubscribe is therefore safe.
    pub fn unsubscribe(&mut self, key: &str) -> bool {
        match self.active.remove(key) {
            Some(disposer) => {
                debug!("Unsubscribing '{}'", key);
                disposer();
                true
            }
            None => false,
        }
    }

    /// Dispose every tracked subscription and clear the registry
    pub fn unsubscribe_all(&mut self) {
        let count = self.active.len();
        for (key, disposer) in self.active.drain() {
            debug!("Unsubscribing '{}'", key);
            disposer();
        }
        if count > 0 {
            info!("Disposed {} subscriptions", count);
        }
    }

    /// Keys of the currently live subscriptions
    ///
    /// Diagnostic accessor; not intended for control flow.
    pub fn active_keys(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no subscriptions are tracked
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Drop for SubscriptionRegistry {
    /// Dropping the registry disposes everything it still tracks
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_disposer(counter: &Arc<AtomicUsize>) -> Disposer {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();

        registry.subscribe("sensor-D1", || counting_disposer(&disposed));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_keys(), vec!["sensor-D1".to_string()]);

        assert!(registry.unsubscribe("sensor-D1"));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_key_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        assert!(!registry.unsubscribe("never-subscribed"));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();

        registry.subscribe("sensor-D1", || counting_disposer(&disposed));
        assert!(registry.unsubscribe("sensor-D1"));
        // Second call finds nothing to dispose
        assert!(!registry.unsubscribe("sensor-D1"));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resubscribe_disposes_previous_exactly_once() {
        let first_disposed = Arc::new(AtomicUsize::new(0));
        let second_disposed = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();

        registry.subscribe("sensor-D1", || counting_disposer(&first_disposed));
        registry.subscribe("sensor-D1", || counting_disposer(&second_disposed));

        // The first disposer ran exactly once; the replacement is still live
        assert_eq!(first_disposed.load(Ordering::SeqCst), 1);
        assert_eq!(second_disposed.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);

        registry.unsubscribe("sensor-D1");
        assert_eq!(second_disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_all() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();

        for key in ["sensor-D1", "sensor-D2", "status", "alerts"] {
            registry.subscribe(key, || counting_disposer(&disposed));
        }
        assert_eq!(registry.len(), 4);

        registry.unsubscribe_all();
        assert_eq!(disposed.load(Ordering::SeqCst), 4);
        assert!(registry.is_empty());
        assert!(registry.active_keys().is_empty());
    }

    #[test]
    fn test_drop_disposes_remaining_subscriptions() {
        let disposed = Arc::new(AtomicUsize::new(0));
        {
            let mut registry = SubscriptionRegistry::new();
            registry.subscribe("sensor-D1", || counting_disposer(&disposed));
            registry.subscribe("sensor-D2", || counting_disposer(&disposed));
        }
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_independent_keys_do_not_interfere() {
        let d1 = Arc::new(AtomicUsize::new(0));
        let d2 = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriptionRegistry::new();

        registry.subscribe("sensor-D1", || counting_disposer(&d1));
        registry.subscribe("sensor-D2", || counting_disposer(&d2));

        registry.unsubscribe("sensor-D1");
        assert_eq!(d1.load(Ordering::SeqCst), 1);
        assert_eq!(d2.load(Ordering::SeqCst), 0);
        assert_eq!(registry.active_keys(), vec!["sensor-D2".to_string()]);
    }
}
