//! Extension platform bridge.
//!
//! Subscribes to host events, normalizes them into plain records, and
//! dispatches payloads back into tabs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   PlatformEvent    ┌─────────────────┐   records   ┌────────────┐
//! │  Extension host │ ─────────────────► │ ExtensionBridge │ ──────────► │ callbacks  │
//! │  (Platform)     │ ◄───────────────── │                 │             └────────────┘
//! └─────────────────┘    send_to_tab     └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`ExtensionBridge`] |
//! | `event` | Host events and normalized records |
//! | `platform` | [`Platform`] capability trait |
//! | `sender` | Sender normalization |
//! | `subscription` | Callback registries and handles |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge implementation.
pub mod core;

/// Host events and normalized records.
pub mod event;

/// Host platform capability.
pub mod platform;

/// Sender normalization.
pub mod sender;

/// Callback registries.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::ExtensionBridge;
pub use event::{MessageEnvelope, PlatformEvent, RawActiveInfo, TabActivationRecord};
pub use platform::Platform;
pub use sender::{OriginTab, RawSender, SenderDescriptor, normalize_sender};
pub use subscription::Subscription;
