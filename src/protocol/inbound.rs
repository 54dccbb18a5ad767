//! Inbound payload types.
//!
//! Payloads from the control endpoint are handed over exactly as received.
//! Decoding happens on demand, and a decode failure concerns only that one
//! message.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value};

use crate::error::{Error, Result};
use crate::identifiers::TabId;

// ============================================================================
// InboundMessage
// ============================================================================

/// A text payload received from the control endpoint.
///
/// The raw text is never modified; [`InboundMessage::json`] parses a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Payload text exactly as received.
    raw: String,
}

impl InboundMessage {
    /// Wraps a received payload.
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the payload text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consumes the message, returning the payload text.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.raw
    }

    /// Parses the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the text is not valid JSON.
    pub fn json(&self) -> Result<Value> {
        from_str(&self.raw).map_err(|e| Error::malformed_payload(e.to_string()))
    }

    /// Decodes the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the text does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        from_str(&self.raw).map_err(|e| Error::malformed_payload(e.to_string()))
    }
}

// ============================================================================
// TabDispatch
// ============================================================================

/// Request from the endpoint to deliver a payload into a tab.
///
/// # Format
///
/// ```json
/// { "tabId": 7, "payload": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDispatch {
    /// Target tab.
    #[serde(rename = "tabId")]
    pub tab_id: TabId,

    /// Opaque payload forwarded to the tab.
    pub payload: Value,
}

impl TabDispatch {
    /// Interprets a decoded payload as a tab dispatch.
    ///
    /// Returns `None` for any other shape.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        from_value(value).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
