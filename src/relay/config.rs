//! Relay configuration.
//!
//! Use [`RelayConfig::builder()`] to construct a validated configuration.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::transport::ChannelConfig;

use super::builder::RelayConfigBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Control endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080";

// ============================================================================
// RelayConfig
// ============================================================================

/// Validated relay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Socket channel settings.
    pub channel: ChannelConfig,

    /// Forward tab activations to the endpoint.
    pub forward_tab_activations: bool,

    /// Forward runtime messages to the endpoint.
    pub forward_runtime_messages: bool,

    /// Deliver inbound tab dispatch frames through the bridge.
    pub dispatch_inbound: bool,
}

impl RelayConfig {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::new()
    }

    /// Returns the control endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.channel.endpoint
    }
}
