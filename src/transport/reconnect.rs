//! Reconnection policy for the socket channel.
//!
//! The default is [`ReconnectPolicy::Never`]: a failed or ended connection
//! is reported and left alone. [`ReconnectPolicy::Exponential`] retries
//! with a doubling delay capped at `max`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default first retry delay.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Default retry delay cap.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// When and how the channel re-establishes a lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Never reconnect.
    #[default]
    Never,

    /// Reconnect with exponential backoff.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on the delay.
        max: Duration,
        /// Retries per outage before giving up (`None` = unlimited).
        max_attempts: Option<u32>,
    },
}

impl ReconnectPolicy {
    /// Creates an unlimited exponential policy.
    #[inline]
    #[must_use]
    pub const fn exponential(initial: Duration, max: Duration) -> Self {
        Self::Exponential {
            initial,
            max,
            max_attempts: None,
        }
    }

    /// Limits retries per outage. No effect on [`ReconnectPolicy::Never`].
    #[inline]
    #[must_use]
    pub const fn with_max_attempts(self, attempts: u32) -> Self {
        match self {
            Self::Never => Self::Never,
            Self::Exponential { initial, max, .. } => Self::Exponential {
                initial,
                max,
                max_attempts: Some(attempts),
            },
        }
    }

    /// Returns `true` unless the policy is [`ReconnectPolicy::Never`].
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Never)
    }

    /// Starts a fresh backoff sequence.
    #[inline]
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            next: match self {
                Self::Never => Duration::ZERO,
                Self::Exponential { initial, .. } => *initial,
            },
            attempts: 0,
        }
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Iterator-like backoff state for one outage.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Policy being applied.
    policy: ReconnectPolicy,
    /// Delay to hand out next.
    next: Duration,
    /// Delays handed out since the last reset.
    attempts: u32,
}

impl Backoff {
    /// Returns the next delay, or `None` when retrying should stop.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let ReconnectPolicy::Exponential {
            initial,
            max,
            max_attempts,
        } = self.policy
        else {
            return None;
        };

        if max_attempts.is_some_and(|limit| self.attempts >= limit) {
            return None;
        }

        let delay = self.next.min(max);
        self.next = delay.saturating_mul(2).max(initial).min(max);
        self.attempts += 1;
        Some(delay)
    }

    /// Restarts the sequence after a successful connection.
    pub fn reset(&mut self) {
        *self = self.policy.backoff();
    }

    /// Returns delays handed out since the last reset.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ============================================================================
// Tests
// ============================================================================
