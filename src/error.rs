//! Error types for the extension relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use extension_relay::{Result, TabId};
//!
//! async fn example(relay: &Relay) -> Result<()> {
//!     relay.bridge().send_to_tab(TabId::new(7), json!("hello")).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::MalformedPayload`] |
//! | Platform | [`Error::Dispatch`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when relay configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the control endpoint cannot be reached.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection attempt exceeded the connect timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// No connection is open.
    ///
    /// Returned when sending on a channel that is closed or never opened.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Operation not valid in the current state.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Inbound payload could not be decoded.
    ///
    /// Per-message and never fatal to the channel.
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Decoder message.
        message: String,
    },

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The host platform failed to deliver a payload to a tab.
    #[error("Dispatch to tab {tab_id} failed: {message}")]
    Dispatch {
        /// Target tab.
        tab_id: TabId,
        /// Failure reported by the platform.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    #[inline]
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Creates a dispatch error.
    #[inline]
    pub fn dispatch(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::Dispatch {
            tab_id,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the error concerns a single message only.
    ///
    /// Such errors never tear down the channel.
    #[inline]
    #[must_use]
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::Json(_) | Self::Dispatch { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("endpoint must use ws");
        assert_eq!(
            err.to_string(),
            "Configuration error: endpoint must use ws"
        );
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = Error::dispatch(TabId::new(7), "No tab with id: 7");
        assert_eq!(err.to_string(), "Dispatch to tab 7 failed: No tab with id: 7");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(!Error::ConnectionClosed.is_timeout());
    }

    #[test]
    fn test_is_per_message() {
        assert!(Error::malformed_payload("eof").is_per_message());
        assert!(Error::dispatch(TabId::new(1), "gone").is_per_message());
        assert!(!Error::ConnectionClosed.is_per_message());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
