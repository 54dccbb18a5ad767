//! Builder pattern for relay configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use extension_relay::{RelayConfig, ReconnectPolicy};
//!
//! # fn example() -> extension_relay::Result<()> {
//! let config = RelayConfig::builder()
//!     .endpoint("ws://127.0.0.1:9222")
//!     .connect_timeout(Duration::from_secs(5))
//!     .reconnect(ReconnectPolicy::exponential(
//!         Duration::from_millis(250),
//!         Duration::from_secs(10),
//!     ))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{ChannelConfig, ReconnectPolicy};

use super::config::{DEFAULT_ENDPOINT, RelayConfig};

// ============================================================================
// RelayConfigBuilder
// ============================================================================

/// Builder for a [`RelayConfig`].
///
/// Use [`RelayConfig::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct RelayConfigBuilder {
    /// Endpoint URL text.
    endpoint: Option<String>,
    /// Probe override.
    probe: Option<Value>,
    /// Connect timeout override.
    connect_timeout: Option<Duration>,
    /// Reconnection policy.
    reconnect: ReconnectPolicy,
    /// Disable tab activation forwarding.
    skip_tab_activations: bool,
    /// Disable runtime message forwarding.
    skip_runtime_messages: bool,
    /// Disable inbound dispatch.
    skip_inbound_dispatch: bool,
}

// ============================================================================
// RelayConfigBuilder Implementation
// ============================================================================

impl RelayConfigBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the control endpoint URL (`ws://host:port[/path]`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the liveness probe value.
    #[inline]
    #[must_use]
    pub fn probe(mut self, probe: Value) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the timeout for a single connection attempt.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the reconnection policy.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Stops forwarding tab activations to the endpoint.
    #[inline]
    #[must_use]
    pub fn without_tab_activations(mut self) -> Self {
        self.skip_tab_activations = true;
        self
    }

    /// Stops forwarding runtime messages to the endpoint.
    #[inline]
    #[must_use]
    pub fn without_runtime_messages(mut self) -> Self {
        self.skip_runtime_messages = true;
        self
    }

    /// Stops delivering inbound tab dispatch frames.
    #[inline]
    #[must_use]
    pub fn without_inbound_dispatch(mut self) -> Self {
        self.skip_inbound_dispatch = true;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint is not a URL
    /// - [`Error::Config`] if the scheme is not `ws`, the host is missing,
    ///   or the connect timeout is zero
    pub fn build(self) -> Result<RelayConfig> {
        let endpoint = Url::parse(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        if endpoint.scheme() != "ws" {
            return Err(Error::config(format!(
                "Endpoint must use the ws scheme, got '{}'",
                endpoint.scheme()
            )));
        }

        if endpoint.host_str().is_none_or(str::is_empty) {
            return Err(Error::config("Endpoint has no host"));
        }

        let mut channel = ChannelConfig::new(endpoint);

        if let Some(probe) = self.probe {
            channel.probe = probe;
        }

        if let Some(timeout) = self.connect_timeout {
            if timeout.is_zero() {
                return Err(Error::config("Connect timeout must be non-zero"));
            }
            channel.connect_timeout = timeout;
        }

        channel.reconnect = self.reconnect;

        Ok(RelayConfig {
            channel,
            forward_tab_activations: !self.skip_tab_activations,
            forward_runtime_messages: !self.skip_runtime_messages,
            dispatch_inbound: !self.skip_inbound_dispatch,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
