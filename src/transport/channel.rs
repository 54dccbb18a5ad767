//! WebSocket channel to the control endpoint.
//!
//! This module owns the single outbound connection, reports its lifecycle,
//! and delivers inbound payloads to a handler.
//!
//! # Session Loop
//!
//! Each connection instance is served by one spawned task that handles:
//!
//! - Incoming text frames from the endpoint
//! - Outgoing frames queued by [`SocketChannel::send`]
//! - Local shutdown requests
//!
//! When a session ends, a supervisor in the same task decides, based on
//! the [`ReconnectPolicy`], whether to connect again.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, to_string};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{InboundMessage, default_probe};

use super::reconnect::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Close reason reported when [`SocketChannel::close`] ends a session.
pub const LOCAL_CLOSE_REASON: &str = "closed by relay";

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound payload handler.
pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Close handler, receiving the optional reason.
pub type CloseHandler = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Error handler.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// State transition handler.
pub type StateHandler = Arc<dyn Fn(ChannelState) + Send + Sync>;

// ============================================================================
// ChannelState
// ============================================================================

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// Never opened.
    #[default]
    Idle,
    /// Connection attempt in progress.
    Connecting,
    /// Connected; probe sent.
    Open,
    /// Connection ended (remote or local close).
    Closed,
    /// Connection failed.
    Errored,
}

impl ChannelState {
    /// Returns `true` if frames can be sent.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` while a connection is live or being established.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ChannelConfig
// ============================================================================

/// Connection settings for a [`SocketChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Control endpoint URL (`ws://`).
    pub endpoint: Url,
    /// Liveness probe sent first on every connection.
    pub probe: Value,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Reconnection behavior.
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    /// Creates a config with the default probe, timeout, and no reconnection.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            probe: default_probe(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::Never,
        }
    }
}

// ============================================================================
// Internal Types
// ============================================================================

/// Commands for the session loop.
enum ChannelCommand {
    /// Write a text frame.
    Send {
        text: String,
        result_tx: oneshot::Sender<Result<()>>,
    },
    /// Close the connection.
    Shutdown,
}

/// A freshly established connection.
struct Session {
    ws: WsStream,
    command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
}

/// Why a session ended.
enum SessionEnd {
    /// Endpoint sent a close frame.
    Remote(Option<String>),
    /// [`SocketChannel::close`] was called.
    Local,
    /// Stream ended without a close frame.
    Ended,
    /// Stream failed.
    Failed(Error),
}

/// Registered handlers, each single-slot.
#[derive(Default)]
struct Handlers {
    message: Mutex<Option<MessageHandler>>,
    close: Mutex<Option<CloseHandler>>,
    error: Mutex<Option<ErrorHandler>>,
    state: Mutex<Option<StateHandler>>,
}

/// State shared between the handle and the session task.
struct ChannelInner {
    config: ChannelConfig,
    state: Mutex<ChannelState>,
    handlers: Handlers,
    /// Present while a session is live.
    command_tx: Mutex<Option<mpsc::UnboundedSender<ChannelCommand>>>,
    /// Set by `close()`; stops reconnection.
    shutdown: AtomicBool,
    /// Wakes a supervisor sleeping between attempts.
    shutdown_notify: Notify,
    /// Set while a supervisor task exists.
    supervising: AtomicBool,
}

// ============================================================================
// SocketChannel
// ============================================================================

/// Single logical connection to the control endpoint.
///
/// Cloning is cheap; clones share the connection and handlers. Handlers
/// are single-slot: setting one replaces the previous.
///
/// # Example
///
/// ```ignore
/// let channel = SocketChannel::new(ChannelConfig::new(url));
///
/// channel.on_message(|message| println!("received {}", message.as_str()));
/// channel.on_error(|e| eprintln!("channel error: {e}"));
///
/// channel.open().await?;
/// channel.send(&json!({"hello": "world"})).await?;
/// channel.close();
/// ```
pub struct SocketChannel {
    inner: Arc<ChannelInner>,
}

impl Clone for SocketChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for SocketChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketChannel")
            .field("endpoint", &self.inner.config.endpoint.as_str())
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// SocketChannel - Public API
// ============================================================================

impl SocketChannel {
    /// Creates a channel. No connection is made until [`open`](Self::open).
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                config,
                state: Mutex::new(ChannelState::Idle),
                handlers: Handlers::default(),
                command_tx: Mutex::new(None),
                shutdown: AtomicBool::new(false),
                shutdown_notify: Notify::new(),
                supervising: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.inner.state.lock()
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.config.endpoint
    }

    /// Connects to the endpoint and sends the liveness probe.
    ///
    /// Moves the state to `Connecting`, then to `Open` on success. A
    /// failure moves it to `Errored` and is reported to the error handler
    /// exactly once. With reconnection enabled, retries continue in the
    /// background after a failed first attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the channel is already open or connecting
    /// - [`Error::Connection`] if the endpoint is unreachable
    /// - [`Error::ConnectionTimeout`] if the attempt exceeds the timeout
    pub async fn open(&self) -> Result<()> {
        self.inner.begin_open()?;

        match self.inner.connect().await {
            Ok(session) => {
                self.spawn_supervisor(Some(session));
                Ok(())
            }
            Err(e) => {
                if self.inner.config.reconnect.is_enabled() {
                    self.spawn_supervisor(None);
                }
                Err(e)
            }
        }
    }

    /// Closes the connection and stops any reconnection.
    ///
    /// The close handler fires once the session task has sent the close
    /// frame. Calling this without a live connection only cancels retries.
    pub fn close(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.shutdown_notify.notify_waiters();

        if !self.inner.request_shutdown() {
            debug!("Close requested with no live connection");
        }
    }

    /// Sends a JSON payload.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if serialization fails
    /// - [`Error::ConnectionClosed`] if no connection is open
    /// - [`Error::WebSocket`] if the write fails
    pub async fn send(&self, payload: &Value) -> Result<()> {
        let text = to_string(payload)?;
        self.send_text(text).await
    }

    /// Sends a raw text frame.
    ///
    /// A write failure is also reported to the error handler; the
    /// connection stays open.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if no connection is open
    /// - [`Error::WebSocket`] if the write fails
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let command_tx = self
            .inner
            .command_tx
            .lock()
            .clone()
            .ok_or(Error::ConnectionClosed)?;

        let (result_tx, result_rx) = oneshot::channel();
        command_tx
            .send(ChannelCommand::Send {
                text: text.into(),
                result_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        result_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Sets the inbound payload handler.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        *self.inner.handlers.message.lock() = Some(Arc::new(handler));
    }

    /// Sets the close handler.
    pub fn on_close<F>(&self, handler: F)
    where
        F: Fn(Option<String>) + Send + Sync + 'static,
    {
        *self.inner.handlers.close.lock() = Some(Arc::new(handler));
    }

    /// Sets the error handler.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        *self.inner.handlers.error.lock() = Some(Arc::new(handler));
    }

    /// Sets the state transition handler.
    pub fn on_state_change<F>(&self, handler: F)
    where
        F: Fn(ChannelState) + Send + Sync + 'static,
    {
        *self.inner.handlers.state.lock() = Some(Arc::new(handler));
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        *self.inner.handlers.message.lock() = None;
        *self.inner.handlers.close.lock() = None;
        *self.inner.handlers.error.lock() = None;
        *self.inner.handlers.state.lock() = None;
    }

    /// Starts the supervisor task.
    fn spawn_supervisor(&self, first: Option<Session>) {
        self.inner.supervising.store(true, Ordering::SeqCst);
        tokio::spawn(Arc::clone(&self.inner).supervise(first));
    }
}

// ============================================================================
// ChannelInner - Lifecycle
// ============================================================================

impl ChannelInner {
    /// Atomically moves an inactive channel to `Connecting`.
    fn begin_open(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            if state.is_active() || self.supervising.load(Ordering::SeqCst) {
                return Err(Error::protocol(format!(
                    "Channel already active (state: {})",
                    *state
                )));
            }
            std::mem::replace(&mut *state, ChannelState::Connecting)
        };

        self.shutdown.store(false, Ordering::SeqCst);
        self.notify_state(previous, ChannelState::Connecting);
        Ok(())
    }

    /// Moves to `next`, logging and notifying.
    fn transition(&self, next: ChannelState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        self.notify_state(previous, next);
    }

    /// Logs a transition and calls the state handler.
    fn notify_state(&self, previous: ChannelState, next: ChannelState) {
        debug!(from = %previous, to = %next, "Channel state changed");

        let handler = self.handlers.state.lock().clone();
        if let Some(handler) = handler {
            handler(next);
        }
    }

    /// Establishes one connection and sends the probe.
    ///
    /// The state must already be `Connecting`.
    async fn connect(&self) -> Result<Session> {
        let endpoint = self.config.endpoint.as_str();
        debug!(endpoint, "Connecting to control endpoint");

        let attempt = timeout(self.config.connect_timeout, connect_async(endpoint)).await;
        let mut ws = match attempt {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                return Err(self.fail(Error::connection(format!("{endpoint}: {e}"))));
            }
            Err(_) => {
                return Err(self.fail(Error::connection_timeout(
                    self.config.connect_timeout.as_millis() as u64,
                )));
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.command_tx.lock() = Some(command_tx);

        self.transition(ChannelState::Open);
        info!(endpoint, "Connected to control endpoint");

        self.send_probe(&mut ws).await;

        Ok(Session { ws, command_rx })
    }

    /// Writes the liveness probe as the first frame.
    async fn send_probe(&self, ws: &mut WsStream) {
        let probe = match to_string(&self.config.probe) {
            Ok(probe) => probe,
            Err(e) => {
                self.report_error(&Error::Json(e));
                return;
            }
        };

        match ws.send(Message::Text(probe.into())).await {
            Ok(()) => trace!("Liveness probe sent"),
            Err(e) => {
                warn!(error = %e, "Failed to send liveness probe");
                self.report_error(&Error::WebSocket(e));
            }
        }
    }

    /// Records a failed attempt.
    fn fail(&self, error: Error) -> Error {
        warn!(error = %error, "Connection attempt failed");
        self.transition(ChannelState::Errored);
        self.report_error(&error);
        error
    }

    /// Queues a shutdown for the live session, if any.
    fn request_shutdown(&self) -> bool {
        let command_tx = self.command_tx.lock().clone();
        command_tx.is_some_and(|tx| tx.send(ChannelCommand::Shutdown).is_ok())
    }

    /// Runs sessions and reconnection attempts until done.
    async fn supervise(self: Arc<Self>, first: Option<Session>) {
        let mut pending = first;
        let mut backoff = self.config.reconnect.backoff();

        loop {
            if let Some(session) = pending.take() {
                backoff.reset();
                if self.shutdown.load(Ordering::SeqCst) {
                    self.request_shutdown();
                }
                let end = self.run_session(session).await;

                if !self.should_reconnect() {
                    // Cleared before the close handler runs so it may reopen
                    self.supervising.store(false, Ordering::SeqCst);
                    self.finish_session(end);
                    debug!("Channel supervisor terminated");
                    return;
                }
                self.finish_session(end);
            }

            if !self.should_reconnect() {
                break;
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(
                    attempts = backoff.attempts(),
                    "Reconnect attempts exhausted, giving up"
                );
                break;
            };

            info!(
                delay_ms = delay.as_millis() as u64,
                attempt = backoff.attempts(),
                "Reconnecting to control endpoint"
            );

            // Must be enabled before the flag check below
            let notified = self.shutdown_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut notified => {}
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            self.transition(ChannelState::Connecting);
            if let Ok(session) = self.connect().await {
                pending = Some(session);
            }
        }

        self.supervising.store(false, Ordering::SeqCst);
        debug!("Channel supervisor terminated");
    }

    /// Returns `true` if a finished session should be followed by a retry.
    fn should_reconnect(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst) && self.config.reconnect.is_enabled()
    }

    /// Reports the end of a session.
    fn finish_session(&self, end: SessionEnd) {
        match end {
            SessionEnd::Remote(reason) => {
                info!(?reason, "Connection closed by endpoint");
                self.transition(ChannelState::Closed);
                self.report_close(reason);
            }
            SessionEnd::Local => {
                info!("Connection closed");
                self.transition(ChannelState::Closed);
                self.report_close(Some(LOCAL_CLOSE_REASON.to_string()));
            }
            SessionEnd::Ended => {
                info!("Connection ended without close frame");
                self.transition(ChannelState::Closed);
                self.report_close(None);
            }
            SessionEnd::Failed(e) => {
                self.transition(ChannelState::Errored);
                self.report_error(&e);
                self.report_close(None);
            }
        }
    }
}

// ============================================================================
// ChannelInner - Session Loop
// ============================================================================

impl ChannelInner {
    /// Serves one connection until it ends.
    async fn run_session(&self, session: Session) -> SessionEnd {
        let Session { ws, mut command_rx } = session;
        let (mut ws_write, mut ws_read) = ws.split();

        let end = loop {
            tokio::select! {
                // Incoming frames from the endpoint
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Payload received");
                            self.deliver(InboundMessage::new(text.as_str()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.as_str().to_string())
                                .filter(|r| !r.is_empty());
                            break SessionEnd::Remote(reason);
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break SessionEnd::Failed(Error::WebSocket(e));
                        }

                        None => break SessionEnd::Ended,

                        // Ignore Binary, Ping, Pong, Frame
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from the channel handle
                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Send { text, result_tx }) => {
                            let result = match ws_write.send(Message::Text(text.into())).await {
                                Ok(()) => {
                                    trace!("Frame sent");
                                    Ok(())
                                }
                                Err(e) => {
                                    warn!(error = %e, "Failed to send frame");
                                    let err = Error::WebSocket(e);
                                    self.report_error(&err);
                                    Err(err)
                                }
                            };
                            let _ = result_tx.send(result);
                        }

                        Some(ChannelCommand::Shutdown) | None => {
                            debug!("Shutdown command received");
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: Utf8Bytes::from_static(LOCAL_CLOSE_REASON),
                            };
                            if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                                debug!(error = %e, "Failed to send close frame");
                            }
                            break SessionEnd::Local;
                        }
                    }
                }
            }
        };

        // Queued sends fail with ConnectionClosed once the receiver drops
        *self.command_tx.lock() = None;
        end
    }

    /// Hands a payload to the message handler.
    fn deliver(&self, message: InboundMessage) {
        let handler = self.handlers.message.lock().clone();
        match handler {
            Some(handler) => handler(message),
            None => trace!("No message handler, payload dropped"),
        }
    }

    /// Calls the error handler.
    fn report_error(&self, error: &Error) {
        let handler = self.handlers.error.lock().clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }

    /// Calls the close handler.
    fn report_close(&self, reason: Option<String>) {
        let handler = self.handlers.close.lock().clone();
        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
