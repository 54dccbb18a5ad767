//! Host platform capability.
//!
//! The bridge never touches a global browser object. Everything it needs
//! from the host goes through [`Platform`], which a real host adapter
//! implements and tests replace with a recording fake.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::TabId;

// ============================================================================
// Platform
// ============================================================================

/// Outbound operations offered by the extension host.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Delivers `payload` to the content context of `tab_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Dispatch`] if the host rejects the delivery,
    /// for example because the tab no longer exists.
    async fn send_to_tab(&self, tab_id: TabId, payload: Value) -> Result<()>;
}

// ============================================================================
// Test Support
// ============================================================================
