//! Per-action execution status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of one action slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ActionStatus {
    /// Never dispatched, or cleared by a reset.
    #[default]
    Idle,
    /// Dispatched and awaiting its completion.
    InFlight,
    /// The last completion succeeded.
    Succeeded,
    /// The last dispatch or completion failed with a user-facing message.
    Failed(String),
}

impl ActionStatus {
    /// Returns true while a call is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    /// Returns true if the last outcome was a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the last outcome was a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}
