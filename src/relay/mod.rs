//! Relay wiring and configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`RelayConfigBuilder`] |
//! | `config` | [`RelayConfig`] |
//! | `core` | [`Relay`] |

// ============================================================================
// Submodules
// ============================================================================

/// Configuration builder.
pub mod builder;

/// Validated configuration.
pub mod config;

/// End-to-end relay.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Relay;
pub use builder::RelayConfigBuilder;
pub use config::{DEFAULT_ENDPOINT, RelayConfig};
