//! Store-level error and outcome types.
//!
//! A thin HTTP route can get away with mapping straight to
//! `Result<T, Status>`, but that loses the updated/not-found/
//! invalid-transition distinction the store itself needs to preserve.

use crate::state_machine::NotificationState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid state name: {0}")]
    InvalidStateName(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result of `transition_notification_state`. Distinguishes "the transition
/// went through" from "no such id" from "illegal from the current state" —
/// a plain optional-row return can be recovered from this with
/// `.updated()`.
#[derive(Debug, Clone)]
pub enum TransitionOutcome<T> {
    Updated(T),
    NotFound,
    Invalid {
        from: NotificationState,
        to: NotificationState,
    },
}

impl<T> TransitionOutcome<T> {
    /// Collapse to the external-interface shape: `Some(row)` on success,
    /// `None` for both "not found" and "invalid transition".
    pub fn updated(self) -> Option<T> {
        match self {
            TransitionOutcome::Updated(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, TransitionOutcome::Updated(_))
    }
}
