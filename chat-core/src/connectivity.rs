//! Connectivity state machine for relaychat.
//!
//! The resilient fetch never surfaces failures to its callers, so this is the
//! only place a UI can learn that the relay is unreachable. The state machine
//! is pure: the fetch layer feeds it one [`FetchEvent`] per attempt and
//! publishes the result through a store.

use std::fmt;
use std::time::Duration;

/// What the client currently knows about the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// No request has completed yet.
    #[default]
    Connecting,
    /// The most recent attempt succeeded.
    Online,
    /// The most recent attempt failed and will be retried.
    Retrying {
        /// Consecutive failures of the request that reported this.
        attempt: u32,
        /// Delay before that request tries again.
        next_delay: Duration,
    },
}

/// Outcome of a single request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent {
    /// The request succeeded.
    Succeeded,
    /// The request failed.
    Failed {
        /// Consecutive failures so far (1-based).
        attempt: u32,
        /// Delay before the next attempt.
        next_delay: Duration,
    },
}

impl Connectivity {
    /// Process an event and return the new state.
    ///
    /// This is a pure function. The latest attempt wins: a success from any
    /// request means the relay is reachable.
    pub fn on_event(self, event: FetchEvent) -> Self {
        match (self, event) {
            (_, FetchEvent::Succeeded) => Self::Online,
            (_, FetchEvent::Failed { attempt, next_delay }) => Self::Retrying {
                attempt,
                next_delay,
            },
        }
    }

    /// Check if the relay answered the most recent request.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Check if requests are currently being retried.
    pub fn is_retrying(&self) -> bool {
        matches!(self, Self::Retrying { .. })
    }
}

crate::same_value_from_eq!(Connectivity);

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Online => write!(f, "online"),
            Self::Retrying {
                attempt,
                next_delay,
            } => write!(
                f,
                "offline (attempt {}, retrying in {}ms)",
                attempt,
                next_delay.as_millis()
            ),
        }
    }
}
