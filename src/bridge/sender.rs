//! Sender identity normalization.
//!
//! The host describes the origin of every runtime message with a bag of
//! optional fields. [`normalize_sender`] turns that bag into a
//! [`SenderDescriptor`] where each field is an explicit [`Presence`].
//!
//! # Fields
//!
//! | Host key | Descriptor field | Type |
//! |----------|------------------|------|
//! | `documentId` | `document_id` | `String` |
//! | `documentLifecycle` | `document_lifecycle` | `String` |
//! | `frameId` | `frame_id` | [`FrameId`] |
//! | `id` | `id` | `String` (extension ID) |
//! | `nativeApplication` | `native_application` | `String` |
//! | `origin` | `origin` | `String` |
//! | `tab` | `tab` | [`OriginTab`] (placeholder) |
//! | `tlsChannelId` | `tls_channel_id` | `String` |
//! | `url` | `url` | `String` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::FrameId;
use crate::presence::Presence;

// ============================================================================
// RawSender
// ============================================================================

/// Sender metadata exactly as the host supplied it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSender {
    /// Document UUID of the sending context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// Lifecycle state of the sending document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_lifecycle: Option<String>,

    /// Frame that sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,

    /// Extension ID of the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Native application name, for native messaging senders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_application: Option<String>,

    /// Origin of the sending page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Host tab object of the sending tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<Value>,

    /// TLS channel ID of the sending page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_channel_id: Option<String>,

    /// URL of the sending page or frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RawSender {
    /// Extracts sender metadata from host JSON without failing.
    ///
    /// A missing key, a `null`, or a value of the wrong type all count as
    /// "not supplied". A non-object input yields an empty sender.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            document_id: string_field(value, "documentId"),
            document_lifecycle: string_field(value, "documentLifecycle"),
            frame_id: value
                .get("frameId")
                .and_then(Value::as_i64)
                .map(FrameId::new),
            id: string_field(value, "id"),
            native_application: string_field(value, "nativeApplication"),
            origin: string_field(value, "origin"),
            tab: value.get("tab").filter(|v| v.is_object()).cloned(),
            tls_channel_id: string_field(value, "tlsChannelId"),
            url: string_field(value, "url"),
        }
    }
}

/// Gets an optional string field.
#[inline]
fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// OriginTab
// ============================================================================

/// Originating tab of a message.
///
/// Placeholder record: it carries no attributes yet. Its presence on a
/// [`SenderDescriptor`] only says that the host attached a tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginTab {}

// ============================================================================
// SenderDescriptor
// ============================================================================

/// Normalized identity and context of a message's origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderDescriptor {
    /// Document UUID of the sending context.
    pub document_id: Presence<String>,
    /// Lifecycle state of the sending document.
    pub document_lifecycle: Presence<String>,
    /// Frame that sent the message.
    pub frame_id: Presence<FrameId>,
    /// Extension ID of the sender.
    pub id: Presence<String>,
    /// Native application name.
    pub native_application: Presence<String>,
    /// Origin of the sending page.
    pub origin: Presence<String>,
    /// Originating tab.
    pub tab: Presence<OriginTab>,
    /// TLS channel ID.
    pub tls_channel_id: Presence<String>,
    /// URL of the sending page or frame.
    pub url: Presence<String>,
}

impl From<&RawSender> for SenderDescriptor {
    #[inline]
    fn from(raw: &RawSender) -> Self {
        normalize_sender(raw)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Converts host sender metadata into a [`SenderDescriptor`].
///
/// Pure and infallible. Every supplied field, including empty strings and
/// zero frame IDs, becomes `Present` with the exact value; every omitted
/// field becomes `Absent`.
#[must_use]
pub fn normalize_sender(raw: &RawSender) -> SenderDescriptor {
    SenderDescriptor {
        document_id: raw.document_id.clone().into(),
        document_lifecycle: raw.document_lifecycle.clone().into(),
        frame_id: raw.frame_id.into(),
        id: raw.id.clone().into(),
        native_application: raw.native_application.clone().into(),
        origin: raw.origin.clone().into(),
        tab: raw.tab.as_ref().map(|_| OriginTab::default()).into(),
        tls_channel_id: raw.tls_channel_id.clone().into(),
        url: raw.url.clone().into(),
    }
}

// ============================================================================
// Tests
// ============================================================================
