//! Platform event records.
//!
//! Host events enter as [`PlatformEvent`]s (or through the typed ingress
//! methods on the bridge) and leave as plain, serializable records.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str};

use crate::error::{Error, Result};
use crate::identifiers::{TabId, WindowId};

use super::sender::{RawSender, SenderDescriptor, normalize_sender};

// ============================================================================
// RawActiveInfo
// ============================================================================

/// Payload of the host's "tab activated" event.
///
/// # Format
///
/// ```json
/// { "tabId": 7, "windowId": 2 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActiveInfo {
    /// Tab that became active.
    pub tab_id: i64,
    /// Window containing the tab.
    pub window_id: i64,
}

// ============================================================================
// TabActivationRecord
// ============================================================================

/// Normalized "tab switched" event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabActivationRecord {
    /// Tab that became active.
    pub tab_id: TabId,
    /// Window containing the tab.
    pub window_id: WindowId,
}

impl From<RawActiveInfo> for TabActivationRecord {
    #[inline]
    fn from(info: RawActiveInfo) -> Self {
        Self {
            tab_id: TabId::new(info.tab_id),
            window_id: WindowId::new(info.window_id),
        }
    }
}

// ============================================================================
// MessageEnvelope
// ============================================================================

/// Normalized cross-context runtime message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Opaque request payload.
    pub request: Value,
    /// Normalized sender.
    pub sender: SenderDescriptor,
}

impl MessageEnvelope {
    /// Builds an envelope, normalizing the sender.
    #[inline]
    #[must_use]
    pub fn new(request: Value, sender: &RawSender) -> Self {
        Self {
            request,
            sender: normalize_sender(sender),
        }
    }
}

// ============================================================================
// PlatformEvent
// ============================================================================

/// An event raised by the host platform.
///
/// # Format
///
/// ```json
/// { "event": "tabActivated", "tabId": 7, "windowId": 2 }
/// { "event": "runtimeMessage", "request": { ... }, "sender": { ... } }
/// ```
///
/// The sender stays untyped here so that odd host values degrade to
/// "absent" during normalization instead of rejecting the whole event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlatformEvent {
    /// The active tab changed.
    TabActivated(RawActiveInfo),

    /// A runtime message arrived from another extension context.
    RuntimeMessage {
        /// Opaque request payload.
        #[serde(default)]
        request: Value,
        /// Host sender metadata.
        #[serde(default)]
        sender: Value,
    },
}

impl PlatformEvent {
    /// Parses a host event from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the text is not a known event.
    pub fn parse(text: &str) -> Result<Self> {
        from_str(text).map_err(|e| Error::malformed_payload(e.to_string()))
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TabActivated(_) => "tabActivated",
            Self::RuntimeMessage { .. } => "runtimeMessage",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
