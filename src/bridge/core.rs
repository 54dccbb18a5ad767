//! Extension bridge core.
//!
//! Turns host events into normalized records for registered callbacks and
//! pushes payloads back into tabs through the [`Platform`] capability.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::TabId;

use super::event::{MessageEnvelope, PlatformEvent, RawActiveInfo, TabActivationRecord};
use super::platform::Platform;
use super::sender::RawSender;
use super::subscription::{Registry, Subscription};

// ============================================================================
// ExtensionBridge
// ============================================================================

/// Bridge between the extension host and the rest of the relay.
///
/// Cloning is cheap; clones share callbacks and the platform handle.
///
/// # Example
///
/// ```ignore
/// let bridge = ExtensionBridge::new(platform);
///
/// let sub = bridge.on_tab_activated(|record| {
///     println!("tab {} active in window {}", record.tab_id, record.window_id);
/// });
///
/// bridge.emit_tab_activated(RawActiveInfo { tab_id: 7, window_id: 2 });
/// sub.unsubscribe();
/// ```
pub struct ExtensionBridge {
    /// Host capability.
    platform: Arc<dyn Platform>,
    /// Tab activation callbacks.
    tab_activated: Arc<Registry<TabActivationRecord>>,
    /// Runtime message callbacks.
    runtime_message: Arc<Registry<MessageEnvelope>>,
}

impl Clone for ExtensionBridge {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            tab_activated: Arc::clone(&self.tab_activated),
            runtime_message: Arc::clone(&self.runtime_message),
        }
    }
}

// ============================================================================
// ExtensionBridge - Subscriptions
// ============================================================================

impl ExtensionBridge {
    /// Creates a bridge over the given host platform.
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            tab_activated: Registry::new("tabActivated"),
            runtime_message: Registry::new("runtimeMessage"),
        }
    }

    /// Registers a callback for tab activation events.
    ///
    /// The callback receives one record per host event while registered.
    /// Events raised before registration are never replayed.
    pub fn on_tab_activated<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TabActivationRecord) + Send + Sync + 'static,
    {
        self.tab_activated.subscribe(Arc::new(callback))
    }

    /// Registers a callback for runtime messages.
    ///
    /// The host's response function is not forwarded: the bridge never
    /// answers a runtime message.
    pub fn on_runtime_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MessageEnvelope) + Send + Sync + 'static,
    {
        self.runtime_message.subscribe(Arc::new(callback))
    }

    /// Returns the number of tab activation callbacks.
    #[inline]
    #[must_use]
    pub fn tab_activated_subscribers(&self) -> usize {
        self.tab_activated.len()
    }

    /// Returns the number of runtime message callbacks.
    #[inline]
    #[must_use]
    pub fn runtime_message_subscribers(&self) -> usize {
        self.runtime_message.len()
    }
}

// ============================================================================
// ExtensionBridge - Host Ingress
// ============================================================================

impl ExtensionBridge {
    /// Delivers a host "tab activated" event.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit_tab_activated(&self, info: RawActiveInfo) -> usize {
        let record = TabActivationRecord::from(info);
        trace!(tab_id = %record.tab_id, window_id = %record.window_id, "Tab activated");
        self.tab_activated.emit(&record)
    }

    /// Delivers a host runtime message.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit_runtime_message(&self, request: Value, sender: &RawSender) -> usize {
        let envelope = MessageEnvelope::new(request, sender);
        trace!(sender_id = ?envelope.sender.id, "Runtime message received");
        self.runtime_message.emit(&envelope)
    }

    /// Delivers any host event.
    pub fn dispatch(&self, event: PlatformEvent) -> usize {
        match event {
            PlatformEvent::TabActivated(info) => self.emit_tab_activated(info),
            PlatformEvent::RuntimeMessage { request, sender } => {
                self.emit_runtime_message(request, &RawSender::from_value(&sender))
            }
        }
    }

    /// Dispatches host events in arrival order until the feed closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<PlatformEvent>) {
        while let Some(event) = events.recv().await {
            let name = event.name();
            let delivered = self.dispatch(event);
            trace!(event = name, delivered, "Host event dispatched");
        }

        debug!("Host event feed closed");
    }
}

// ============================================================================
// ExtensionBridge - Outbound
// ============================================================================

impl ExtensionBridge {
    /// Sends `payload` into the context of `tab_id`.
    ///
    /// Issues exactly one platform dispatch, whether or not the tab exists.
    /// The outcome is returned but never retried.
    ///
    /// # Errors
    ///
    /// Returns the platform's error, typically [`crate::Error::Dispatch`].
    pub async fn send_to_tab(&self, tab_id: TabId, payload: Value) -> Result<()> {
        trace!(%tab_id, "Dispatching payload to tab");

        match self.platform.send_to_tab(tab_id, payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(%tab_id, error = %e, "Dispatch to tab failed");
                Err(e)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::bridge::platform::testing::RecordingPlatform;
    use crate::error::Error;
    use crate::identifiers::WindowId;
    use crate::presence::Presence;

    fn bridge() -> (ExtensionBridge, Arc<RecordingPlatform>) {
        let platform = Arc::new(RecordingPlatform::default());
        (ExtensionBridge::new(platform.clone()), platform)
    }

    #[test]
    fn test_tab_activation_scenario() {
        let (bridge, _) = bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = bridge.on_tab_activated(move |record| sink.lock().push(*record));

        bridge.emit_tab_activated(RawActiveInfo {
            tab_id: 7,
            window_id: 2,
        });

        assert_eq!(
            *seen.lock(),
            vec![TabActivationRecord {
                tab_id: TabId::new(7),
                window_id: WindowId::new(2),
            }]
        );
    }

    #[test]
    fn test_every_event_reaches_every_callback() {
        let (bridge, _) = bridge();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let a = Arc::clone(&first);
        let _a = bridge.on_tab_activated(move |r| a.lock().push(r.tab_id.as_i64()));
        let b = Arc::clone(&second);
        let _b = bridge.on_tab_activated(move |r| b.lock().push(r.tab_id.as_i64()));

        for tab_id in [1, 2, 2, 3] {
            assert_eq!(
                bridge.emit_tab_activated(RawActiveInfo {
                    tab_id,
                    window_id: 1
                }),
                2
            );
        }

        assert_eq!(*first.lock(), vec![1, 2, 2, 3]);
        assert_eq!(*second.lock(), vec![1, 2, 2, 3]);
    }

    #[test]
    fn test_unsubscribed_callback_stops_receiving() {
        let (bridge, _) = bridge();
        let kept = Arc::new(Mutex::new(0));
        let dropped = Arc::new(Mutex::new(0));

        let k = Arc::clone(&kept);
        let _kept = bridge.on_tab_activated(move |_| *k.lock() += 1);
        let d = Arc::clone(&dropped);
        let sub = bridge.on_tab_activated(move |_| *d.lock() += 1);

        let info = RawActiveInfo {
            tab_id: 1,
            window_id: 1,
        };
        bridge.emit_tab_activated(info);
        assert!(sub.unsubscribe());
        bridge.emit_tab_activated(info);

        assert_eq!(*kept.lock(), 2);
        assert_eq!(*dropped.lock(), 1);
        assert_eq!(bridge.tab_activated_subscribers(), 1);
    }

    #[test]
    fn test_runtime_message_envelope() {
        let (bridge, _) = bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = bridge.on_runtime_message(move |envelope| sink.lock().push(envelope.clone()));

        let delivered = bridge.dispatch(PlatformEvent::RuntimeMessage {
            request: json!({"op": "scrape"}),
            sender: json!({"id": "abc", "url": "https://x"}),
        });
        assert_eq!(delivered, 1);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].request, json!({"op": "scrape"}));
        assert_eq!(seen[0].sender.id, Presence::Present("abc".to_string()));
        assert_eq!(seen[0].sender.url, Presence::Present("https://x".to_string()));
        assert!(seen[0].sender.origin.is_absent());
        assert!(seen[0].sender.tab.is_absent());
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let (bridge, _) = bridge();
        assert_eq!(
            bridge.dispatch(PlatformEvent::TabActivated(RawActiveInfo {
                tab_id: 1,
                window_id: 1
            })),
            0
        );
    }

    #[tokio::test]
    async fn test_send_to_tab_single_dispatch() {
        let (bridge, platform) = bridge();

        bridge
            .send_to_tab(TabId::new(7), json!({"cmd": "highlight"}))
            .await
            .expect("dispatch should succeed");

        assert_eq!(
            *platform.calls.lock(),
            vec![(TabId::new(7), json!({"cmd": "highlight"}))]
        );
    }

    #[tokio::test]
    async fn test_send_to_missing_tab_still_dispatches_once() {
        let (bridge, platform) = bridge();
        platform.close_tab(TabId::new(9));

        let result = bridge.send_to_tab(TabId::new(9), json!("hi")).await;

        assert!(matches!(result, Err(Error::Dispatch { .. })));
        assert_eq!(platform.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_run_preserves_order() {
        let (bridge, _) = bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = bridge.on_tab_activated(move |r| sink.lock().push(r.tab_id.as_i64()));

        let (tx, rx) = mpsc::unbounded_channel();
        for tab_id in 1..=5 {
            tx.send(PlatformEvent::TabActivated(RawActiveInfo {
                tab_id,
                window_id: 1,
            }))
            .expect("send event");
        }
        drop(tx);

        bridge.run(rx).await;

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_run_waits_for_feed() {
        let (bridge, _) = bridge();
        let seen = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&seen);
        let _sub = bridge.on_tab_activated(move |_| *sink.lock() += 1);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut run = task::spawn(bridge.run(rx));
        assert_pending!(run.poll());

        tx.send(PlatformEvent::TabActivated(RawActiveInfo {
            tab_id: 1,
            window_id: 1,
        }))
        .expect("send event");
        assert!(run.is_woken());
        assert_pending!(run.poll());
        assert_eq!(*seen.lock(), 1);

        drop(tx);
        assert_ready!(run.poll());
    }
}
