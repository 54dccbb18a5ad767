//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged between the relay and the
//! control endpoint. The endpoint's own protocol is opaque to the relay;
//! these types cover only the relay's default framing.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | Probe | Relay → Endpoint | Liveness signal, first frame of every connection |
//! | `OutboundEvent` | Relay → Endpoint | Normalized platform event |
//! | `InboundMessage` | Endpoint → Relay | Raw payload, decoded by the consumer |
//! | `TabDispatch` | Endpoint → Relay | Payload to deliver into a tab |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Inbound payload wrapper and tab dispatch command |
//! | `outbound` | Probe and outbound event framing |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound payload types.
pub mod inbound;

/// Outbound frame types.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{InboundMessage, TabDispatch};
pub use outbound::{DEFAULT_PROBE, OutboundEvent, default_probe};
