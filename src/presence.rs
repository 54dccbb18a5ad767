//! Explicit present/absent wrapper for optional platform fields.
//!
//! The host platform omits fields freely. Passing those through as bare
//! `Option`s into JSON would turn "omitted" into `null`, which a consumer
//! cannot tell apart from a deliberate value. [`Presence`] keeps the
//! distinction on both sides of the wire:
//!
//! ```json
//! { "url": { "present": "https://x" }, "origin": "absent" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Presence
// ============================================================================

/// A field the host platform either supplied or omitted.
///
/// `Present` carries the exact supplied value, including empty strings and
/// zeroes. `Absent` means the platform did not supply the field at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Presence<T> {
    /// The platform supplied this value.
    Present(T),
    /// The platform did not supply the field.
    #[default]
    Absent,
}

impl<T> Presence<T> {
    /// Returns `true` if the field was supplied.
    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Returns `true` if the field was omitted.
    #[inline]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Borrows the inner value.
    #[inline]
    #[must_use]
    pub const fn as_ref(&self) -> Presence<&T> {
        match self {
            Self::Present(value) => Presence::Present(value),
            Self::Absent => Presence::Absent,
        }
    }

    /// Maps the supplied value, keeping absence.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Presence<U> {
        match self {
            Self::Present(value) => Presence::Present(f(value)),
            Self::Absent => Presence::Absent,
        }
    }

    /// Unwraps into a plain `Option`.
    #[inline]
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Presence<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}

impl<T> From<Presence<T>> for Option<T> {
    #[inline]
    fn from(value: Presence<T>) -> Self {
        value.into_option()
    }
}

// ============================================================================
// Tests
// ============================================================================
