//! Relay core.
//!
//! Connects the [`ExtensionBridge`] and the [`SocketChannel`]:
//!
//! ```text
//! host events ──► ExtensionBridge ──► outbound queue ──► SocketChannel ──► endpoint
//! host tabs   ◄── ExtensionBridge ◄── inbound queue  ◄── SocketChannel ◄── endpoint
//! ```
//!
//! Both queues preserve order. Nothing is buffered while the channel is
//! down: events raised then are dropped and logged.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::to_string;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::bridge::{ExtensionBridge, Platform, Subscription};
use crate::error::{Error, Result};
use crate::protocol::{InboundMessage, OutboundEvent, TabDispatch};
use crate::transport::SocketChannel;

use super::config::RelayConfig;

// ============================================================================
// Relay
// ============================================================================

/// End-to-end relay between the extension host and the control endpoint.
///
/// The relay owns the channel's message, error, and close handlers once
/// started.
///
/// # Example
///
/// ```ignore
/// let config = RelayConfig::builder().endpoint("ws://127.0.0.1:8080").build()?;
/// let relay = Relay::new(config, Arc::new(MyHostPlatform::new()));
///
/// relay.start().await?;
///
/// // Host adapter feeds events in:
/// relay.bridge().emit_tab_activated(RawActiveInfo { tab_id: 7, window_id: 2 });
///
/// relay.shutdown();
/// ```
pub struct Relay {
    /// Validated configuration.
    config: RelayConfig,
    /// Host side.
    bridge: ExtensionBridge,
    /// Endpoint side.
    channel: SocketChannel,
    /// Bridge callbacks installed by `start`.
    subscriptions: Mutex<Vec<Subscription>>,
    /// Forwarding tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Set once `start` has run.
    started: AtomicBool,
}

impl Relay {
    /// Creates a relay. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(config: RelayConfig, platform: Arc<dyn Platform>) -> Self {
        let channel = SocketChannel::new(config.channel.clone());
        Self {
            config,
            bridge: ExtensionBridge::new(platform),
            channel,
            subscriptions: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Returns the extension bridge.
    #[inline]
    #[must_use]
    pub fn bridge(&self) -> &ExtensionBridge {
        &self.bridge
    }

    /// Returns the socket channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &SocketChannel {
        &self.channel
    }

    /// Wires both sides together and opens the channel.
    ///
    /// With reconnection enabled the relay keeps working in the background
    /// even when this returns an error.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the relay was already started
    /// - Any error from [`SocketChannel::open`]
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::protocol("Relay already started"));
        }

        self.install_outbound();
        self.install_inbound();

        self.channel.on_error(|e| {
            warn!(error = %e, "Control channel error");
        });
        self.channel.on_close(|reason| {
            info!(?reason, "Control channel closed");
        });

        info!(endpoint = %self.config.endpoint(), "Relay started");
        self.channel.open().await
    }

    /// Unsubscribes from the bridge, stops forwarding, and closes the channel.
    ///
    /// Also runs when the relay is dropped.
    pub fn shutdown(&self) {
        let subscriptions: Vec<Subscription> = self.subscriptions.lock().drain(..).collect();
        let count = subscriptions.len();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }

        self.channel.close();

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }

        debug!(subscriptions = count, "Relay shut down");
    }

    /// Subscribes to bridge events and spawns the outbound forwarder.
    fn install_outbound(&self) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();
        let mut subscriptions = self.subscriptions.lock();

        if self.config.forward_tab_activations {
            let tx = outbound_tx.clone();
            subscriptions.push(self.bridge.on_tab_activated(move |record| {
                let _ = tx.send(OutboundEvent::from(*record));
            }));
        }

        if self.config.forward_runtime_messages {
            let tx = outbound_tx.clone();
            subscriptions.push(self.bridge.on_runtime_message(move |envelope| {
                let _ = tx.send(OutboundEvent::from(envelope.clone()));
            }));
        }

        // Forwarder ends once every subscription is dropped
        drop(outbound_tx);

        let channel = self.channel.clone();
        self.tasks
            .lock()
            .push(tokio::spawn(forward_outbound(channel, outbound_rx)));
    }

    /// Installs the channel message handler and the inbound dispatcher.
    fn install_inbound(&self) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundMessage>();

        self.channel.on_message(move |message| {
            let _ = inbound_tx.send(message);
        });

        let bridge = self.bridge.clone();
        let dispatch = self.config.dispatch_inbound;
        self.tasks
            .lock()
            .push(tokio::spawn(dispatch_inbound(bridge, inbound_rx, dispatch)));
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Forwarding Tasks
// ============================================================================

/// Sends bridge events to the endpoint in order.
async fn forward_outbound(channel: SocketChannel, mut events: mpsc::UnboundedReceiver<OutboundEvent>) {
    while let Some(event) = events.recv().await {
        let kind = event.kind();

        let text = match to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(kind, error = %e, "Failed to serialize event");
                continue;
            }
        };

        match channel.send_text(text).await {
            Ok(()) => trace!(kind, "Event forwarded"),
            Err(Error::ConnectionClosed) => debug!(kind, "Channel not open, event dropped"),
            Err(e) => warn!(kind, error = %e, "Failed to forward event"),
        }
    }

    debug!("Outbound forwarder terminated");
}

/// Decodes endpoint payloads and delivers tab dispatches in order.
async fn dispatch_inbound(
    bridge: ExtensionBridge,
    mut messages: mpsc::UnboundedReceiver<InboundMessage>,
    dispatch: bool,
) {
    while let Some(message) = messages.recv().await {
        let value = match message.json() {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Skipping malformed payload");
                continue;
            }
        };

        if !dispatch {
            trace!("Inbound dispatch disabled, payload ignored");
            continue;
        }

        let Some(TabDispatch { tab_id, payload }) = TabDispatch::from_json(value) else {
            debug!("Payload is not a tab dispatch, ignored");
            continue;
        };

        // Failures are logged by the bridge and never retried
        let _ = bridge.send_to_tab(tab_id, payload).await;
    }

    debug!("Inbound dispatcher terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{WebSocketStream, accept_async};

    use crate::bridge::platform::testing::RecordingPlatform;
    use crate::bridge::{RawActiveInfo, RawSender};
    use crate::identifiers::TabId;
    use crate::transport::ChannelState;

    const WAIT: Duration = Duration::from_secs(5);

    async fn endpoint() -> (TcpListener, String) {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = timeout(WAIT, listener.accept())
            .await
            .expect("relay should connect")
            .expect("accept should succeed");
        accept_async(stream).await.expect("handshake should succeed")
    }

    async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
        loop {
            let message = timeout(WAIT, ws.next())
                .await
                .expect("frame should arrive")
                .expect("stream should be open")
                .expect("frame should be valid");
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).expect("relay sends JSON");
            }
        }
    }

    fn relay_for(url: &str, platform: Arc<RecordingPlatform>) -> Relay {
        let config = RelayConfig::builder()
            .endpoint(url)
            .build()
            .expect("valid config");
        Relay::new(config, platform)
    }

    #[tokio::test]
    async fn test_tab_activation_reaches_endpoint() {
        let (listener, url) = endpoint().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let probe = next_json(&mut ws).await;
            let event = next_json(&mut ws).await;
            (probe, event)
        });

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        relay.start().await.expect("start should succeed");

        relay.bridge().emit_tab_activated(RawActiveInfo {
            tab_id: 7,
            window_id: 2,
        });

        let (probe, event) = server.await.expect("server task");
        assert_eq!(probe, json!("ping"));
        assert_eq!(
            event,
            json!({"type": "tabActivated", "tabId": 7, "windowId": 2})
        );

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_runtime_message_reaches_endpoint() {
        let (listener, url) = endpoint().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _probe = next_json(&mut ws).await;
            next_json(&mut ws).await
        });

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        relay.start().await.expect("start should succeed");

        let sender = RawSender {
            id: Some("abc".into()),
            url: Some("https://x".into()),
            ..RawSender::default()
        };
        relay
            .bridge()
            .emit_runtime_message(json!({"op": "read"}), &sender);

        let event = server.await.expect("server task");
        assert_eq!(event["type"], "runtimeMessage");
        assert_eq!(event["request"], json!({"op": "read"}));
        assert_eq!(event["sender"]["id"], json!({"present": "abc"}));
        assert_eq!(event["sender"]["url"], json!({"present": "https://x"}));
        assert_eq!(event["sender"]["origin"], json!("absent"));

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_inbound_dispatch_survives_malformed_frames() {
        let (listener, url) = endpoint().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _probe = next_json(&mut ws).await;
            for frame in [
                r#"{"tabId":7,"payload":{"x":1}}"#,
                "{definitely not json",
                r#""pong""#,
                r#"{"tabId":8,"payload":"y"}"#,
            ] {
                ws.send(Message::Text(frame.into())).await.expect("send");
            }
            ws
        });

        let (platform, mut calls) = RecordingPlatform::with_notify();
        let relay = relay_for(&url, Arc::new(platform));
        relay.start().await.expect("start should succeed");
        let _ws = server.await.expect("server task");

        let first = timeout(WAIT, calls.recv()).await.expect("dispatch").expect("open");
        let second = timeout(WAIT, calls.recv()).await.expect("dispatch").expect("open");

        assert_eq!(first, (TabId::new(7), json!({"x": 1})));
        assert_eq!(second, (TabId::new(8), json!("y")));

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let (listener, url) = endpoint().await;
        let _server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _probe = next_json(&mut ws).await;
            tokio::time::sleep(WAIT).await;
        });

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        relay.start().await.expect("start should succeed");

        let second = relay.start().await;
        assert!(matches!(second, Err(Error::Protocol { .. })));

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_drops_events() {
        let (listener, url) = endpoint().await;
        drop(listener);

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        let result = relay.start().await;
        assert!(result.is_err());

        let delivered = relay.bridge().emit_tab_activated(RawActiveInfo {
            tab_id: 1,
            window_id: 1,
        });
        assert_eq!(delivered, 1);
        assert!(!relay.channel().state().is_open());

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_unsubscribes() {
        let (listener, url) = endpoint().await;
        drop(listener);

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        let _ = relay.start().await;

        assert_eq!(relay.bridge().tab_activated_subscribers(), 1);
        assert_eq!(relay.bridge().runtime_message_subscribers(), 1);

        relay.shutdown();

        assert_eq!(relay.bridge().tab_activated_subscribers(), 0);
        assert_eq!(relay.bridge().runtime_message_subscribers(), 0);
    }

    #[tokio::test]
    async fn test_forwarding_toggles() {
        let (listener, url) = endpoint().await;
        drop(listener);

        let config = RelayConfig::builder()
            .endpoint(url)
            .without_tab_activations()
            .build()
            .expect("valid config");
        let relay = Relay::new(config, Arc::new(RecordingPlatform::default()));
        let _ = relay.start().await;

        assert_eq!(relay.bridge().tab_activated_subscribers(), 0);
        assert_eq!(relay.bridge().runtime_message_subscribers(), 1);

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_drop_releases_connection() {
        let (listener, url) = endpoint().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _probe = next_json(&mut ws).await;
            loop {
                match timeout(WAIT, ws.next()).await {
                    Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return true,
                    Ok(Some(Ok(_))) => continue,
                    Err(_) => return false,
                }
            }
        });

        let relay = relay_for(&url, Arc::new(RecordingPlatform::default()));
        relay.start().await.expect("start should succeed");
        let bridge = relay.bridge().clone();
        let channel = relay.channel().clone();

        drop(relay);

        assert!(server.await.expect("server task"), "connection left open");
        assert_eq!(bridge.tab_activated_subscribers(), 0);
        assert_eq!(bridge.runtime_message_subscribers(), 0);

        let deadline = tokio::time::Instant::now() + WAIT;
        while channel.state() != ChannelState::Closed && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_inbound_dispatch_disabled() {
        let (listener, url) = endpoint().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _probe = next_json(&mut ws).await;
            ws.send(Message::Text(r#"{"tabId":7,"payload":"x"}"#.into()))
                .await
                .expect("send");
            ws
        });

        let (platform, mut calls) = RecordingPlatform::with_notify();
        let config = RelayConfig::builder()
            .endpoint(url)
            .without_inbound_dispatch()
            .build()
            .expect("valid config");
        let relay = Relay::new(config, Arc::new(platform));
        relay.start().await.expect("start should succeed");
        let _ws = server.await.expect("server task");

        let call = timeout(Duration::from_millis(200), calls.recv()).await;
        assert!(call.is_err(), "no tab dispatch expected");

        relay.shutdown();
    }
}
