//! Outbound frame types.
//!
//! Every new connection starts with the probe. After that the relay sends
//! one [`OutboundEvent`] per normalized platform event.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::bridge::{MessageEnvelope, TabActivationRecord};

// ============================================================================
// Constants
// ============================================================================

/// Liveness probe literal sent as the first frame of every connection.
pub const DEFAULT_PROBE: &str = "ping";

/// Returns the default probe as a JSON value.
///
/// Serialized on the wire as `"ping"` (a JSON string, quotes included).
#[inline]
#[must_use]
pub fn default_probe() -> Value {
    Value::String(DEFAULT_PROBE.to_string())
}

// ============================================================================
// OutboundEvent
// ============================================================================

/// A normalized platform event sent to the control endpoint.
///
/// # Format
///
/// ```json
/// { "type": "tabActivated", "tabId": 7, "windowId": 2 }
/// { "type": "runtimeMessage", "request": { ... }, "sender": { ... } }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// A tab became active.
    TabActivated(TabActivationRecord),
    /// A cross-context runtime message arrived.
    RuntimeMessage(MessageEnvelope),
}

impl OutboundEvent {
    /// Returns the `type` tag of this event.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TabActivated(_) => "tabActivated",
            Self::RuntimeMessage(_) => "runtimeMessage",
        }
    }
}

impl From<TabActivationRecord> for OutboundEvent {
    #[inline]
    fn from(record: TabActivationRecord) -> Self {
        Self::TabActivated(record)
    }
}

impl From<MessageEnvelope> for OutboundEvent {
    #[inline]
    fn from(envelope: MessageEnvelope) -> Self {
        Self::RuntimeMessage(envelope)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, to_string, to_value};

    use crate::bridge::{RawSender, normalize_sender};
    use crate::identifiers::{TabId, WindowId};

    #[test]
    fn test_probe_wire_text() {
        assert_eq!(to_string(&default_probe()).expect("serialize"), r#""ping""#);
    }

    #[test]
    fn test_tab_activated_framing() {
        let event = OutboundEvent::from(TabActivationRecord {
            tab_id: TabId::new(7),
            window_id: WindowId::new(2),
        });

        assert_eq!(event.kind(), "tabActivated");
        assert_eq!(
            to_value(&event).expect("serialize"),
            json!({"type": "tabActivated", "tabId": 7, "windowId": 2})
        );
    }

    #[test]
    fn test_runtime_message_framing() {
        let raw = RawSender {
            id: Some("abc".into()),
            ..RawSender::default()
        };
        let event = OutboundEvent::from(MessageEnvelope {
            request: json!({"hello": true}),
            sender: normalize_sender(&raw),
        });

        let value = to_value(&event).expect("serialize");
        assert_eq!(value["type"], "runtimeMessage");
        assert_eq!(value["request"], json!({"hello": true}));
        assert_eq!(value["sender"]["id"], json!({"present": "abc"}));
        assert_eq!(value["sender"]["url"], json!("absent"));
    }
}
