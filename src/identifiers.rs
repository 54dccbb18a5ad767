//! Type-safe identifiers for platform entities.
//!
//! Newtype wrappers prevent mixing a tab ID with a window ID at compile
//! time. All platform IDs are signed because the host reserves negative
//! sentinels (for example `-1` for "no window").

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// Macro
// ============================================================================

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw platform value.
            #[inline]
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw platform value.
            #[inline]
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

// ============================================================================
// Platform IDs
// ============================================================================

platform_id!(
    /// Browser tab identifier.
    TabId
);

platform_id!(
    /// Browser window identifier.
    WindowId
);

platform_id!(
    /// Frame identifier within a tab (0 = top-level frame).
    FrameId
);

// ============================================================================
// SubscriptionId
// ============================================================================

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifier of a bridge callback registration.
///
/// Allocated from a process-wide counter, so IDs increase in registration
/// order and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next subscription ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
