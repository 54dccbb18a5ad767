//! WebSocket transport layer.
//!
//! This module handles the relay's single connection to the control
//! endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Relay (Rust)   │                              │  Control        │
//! │                 │         WebSocket            │  endpoint       │
//! │  SocketChannel  │─────────────────────────────►│                 │
//! │  (client)       │◄─────────────────────────────│  (server)       │
//! └─────────────────┘      ws://127.0.0.1:PORT     └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `SocketChannel::new` - No connection yet (`Idle`)
//! 2. `SocketChannel::open` - `Connecting`, then `Open` and the probe is sent
//! 3. Session task delivers payloads and writes queued frames
//! 4. Remote close, stream failure, or `SocketChannel::close` ends the session
//! 5. `ReconnectPolicy` decides whether to connect again
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Socket channel and session loop |
//! | `reconnect` | Reconnection policy and backoff |

// ============================================================================
// Submodules
// ============================================================================

/// Socket channel and session loop.
pub mod channel;

/// Reconnection policy.
pub mod reconnect;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{
    ChannelConfig, ChannelState, CloseHandler, ErrorHandler, LOCAL_CLOSE_REASON, MessageHandler,
    SocketChannel, StateHandler,
};
pub use reconnect::{Backoff, ReconnectPolicy};
