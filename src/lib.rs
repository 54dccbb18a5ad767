//! Extension Relay - WebSocket relay for a browser extension's background context.
//!
//! This library forwards browser platform events to a local control process
//! over a WebSocket, and delivers payloads from that process into tabs.
//!
//! # Architecture
//!
//! The relay has two sides:
//!
//! - **Extension Bridge**: Subscribes to host events, normalizes them into
//!   plain records, and dispatches payloads into tabs through [`Platform`]
//! - **Socket Channel**: Holds one WebSocket client connection to the
//!   control endpoint and surfaces its lifecycle as callbacks
//!
//! Key design principles:
//!
//! - Every optional host field is explicitly [`Presence::Present`] or
//!   [`Presence::Absent`], never silently dropped
//! - Events arrive in the order the host raised them
//! - Nothing is buffered while the channel is down
//! - The host platform is an injected capability, never a global
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use extension_relay::{Platform, RawActiveInfo, Relay, RelayConfig, Result, TabId};
//!
//! struct Host;
//!
//! #[async_trait::async_trait]
//! impl Platform for Host {
//!     async fn send_to_tab(&self, _tab_id: TabId, _payload: serde_json::Value) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RelayConfig::builder()
//!         .endpoint("ws://127.0.0.1:8080")
//!         .build()?;
//!
//!     let relay = Relay::new(config, Arc::new(Host));
//!     relay.start().await?;
//!
//!     relay.bridge().emit_tab_activated(RawActiveInfo { tab_id: 7, window_id: 2 });
//!
//!     relay.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Extension bridge: [`ExtensionBridge`], [`normalize_sender`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`presence`] | Present/absent field wrapper |
//! | [`protocol`] | Relay wire messages |
//! | [`relay`] | Wiring and configuration |
//! | [`transport`] | Socket channel and reconnection |

// ============================================================================
// Modules
// ============================================================================

/// Extension platform bridge.
///
/// - [`ExtensionBridge`] - Event subscriptions and tab dispatch
/// - [`Platform`] - Host capability trait
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for platform entities.
pub mod identifiers;

/// Present/absent wrapper for optional platform fields.
pub mod presence;

/// Relay wire messages.
pub mod protocol;

/// End-to-end relay and its configuration.
pub mod relay;

/// WebSocket client transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    ExtensionBridge, MessageEnvelope, OriginTab, Platform, PlatformEvent, RawActiveInfo,
    RawSender, SenderDescriptor, Subscription, TabActivationRecord, normalize_sender,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, SubscriptionId, TabId, WindowId};

// Presence
pub use presence::Presence;

// Protocol types
pub use protocol::{InboundMessage, OutboundEvent, TabDispatch};

// Relay types
pub use relay::{Relay, RelayConfig, RelayConfigBuilder};

// Transport types
pub use transport::{ChannelConfig, ChannelState, ReconnectPolicy, SocketChannel};
