//! Callback registries and subscription handles.
//!
//! A [`Registry`] fans each event out to every callback registered at the
//! time of emission, in registration order. Registration returns a
//! [`Subscription`] handle for deterministic removal.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Shared callback type.
pub(crate) type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Type-erased removal, so handles need not know the event type.
trait Unsubscribe: Send + Sync {
    /// Removes a callback, returning whether it was registered.
    fn remove(&self, id: SubscriptionId) -> bool;
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered set of callbacks for one event kind.
pub(crate) struct Registry<T> {
    /// Event kind, for logging.
    name: &'static str,
    /// Callbacks in registration order.
    entries: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T: 'static> Registry<T> {
    /// Creates an empty registry.
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            entries: Mutex::new(Vec::new()),
        })
    }

    /// Registers a callback.
    pub(crate) fn subscribe(self: &Arc<Self>, callback: Callback<T>) -> Subscription {
        let id = SubscriptionId::next();
        self.entries.lock().push((id, callback));
        debug!(event = self.name, %id, "Callback registered");

        let registry: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        Subscription { id, registry }
    }

    /// Delivers `item` to every currently registered callback.
    ///
    /// The list is snapshotted first, so callbacks may subscribe or
    /// unsubscribe while running. Returns the number of callbacks invoked.
    pub(crate) fn emit(&self, item: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &snapshot {
            callback(item);
        }

        trace!(event = self.name, delivered = snapshot.len(), "Event delivered");
        snapshot.len()
    }

    /// Returns the number of registered callbacks.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<T: 'static> Unsubscribe for Registry<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;

        if removed {
            debug!(event = self.name, %id, "Callback unregistered");
        }
        removed
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to a registered bridge callback.
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    /// Registration ID.
    id: SubscriptionId,
    /// Owning registry.
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    /// Returns the registration ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the callback.
    ///
    /// Returns `false` if it was already removed or the bridge is gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &(self.registry.strong_count() > 0))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fan_out_in_registration_order() {
        let registry = Registry::<u32>::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = registry.subscribe(Arc::new(move |n: &u32| first.lock().push(("a", *n))));
        let second = Arc::clone(&seen);
        let _b = registry.subscribe(Arc::new(move |n: &u32| second.lock().push(("b", *n))));

        assert_eq!(registry.emit(&5), 2);
        assert_eq!(*seen.lock(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let registry = Registry::<u32>::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let sub = registry.subscribe(Arc::new(move |_: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.emit(&1);
        assert!(sub.unsubscribe());
        registry.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = Registry::<u32>::new("test");
        let sub = registry.subscribe(Arc::new(|_: &u32| {}));
        drop(registry);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_no_retroactive_delivery() {
        let registry = Registry::<u32>::new("test");
        assert_eq!(registry.emit(&1), 0);

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _sub = registry.subscribe(Arc::new(move |_: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_subscribe_reentrantly() {
        let registry = Registry::<u32>::new("test");
        let inner = Arc::clone(&registry);
        let _sub = registry.subscribe(Arc::new(move |_: &u32| {
            let _ = inner.subscribe(Arc::new(|_: &u32| {}));
        }));

        assert_eq!(registry.emit(&1), 1);
        assert_eq!(registry.len(), 2);
    }
}
