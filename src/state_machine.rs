//! Notification lifecycle: the closed set of states, the legal transition
//! table, and the terminal/retryable classifications. Encoded as an
//! exhaustive `match` rather than free-form strings; the `CHECK` constraint
//! on `notifications.state` (see `db.rs`) enforces the same set at the
//! storage layer regardless of what this module does.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Queued,
    Delivering,
    Delivered,
    Seen,
    Accepted,
    Declined,
    InProgress,
    DeferredBusy,
    Failed,
    Timeout,
    DeadLetter,
    Reassigned,
    Completed,
}

impl NotificationState {
    pub const ALL: [NotificationState; 13] = [
        NotificationState::Queued,
        NotificationState::Delivering,
        NotificationState::Delivered,
        NotificationState::Seen,
        NotificationState::Accepted,
        NotificationState::Declined,
        NotificationState::InProgress,
        NotificationState::DeferredBusy,
        NotificationState::Failed,
        NotificationState::Timeout,
        NotificationState::DeadLetter,
        NotificationState::Reassigned,
        NotificationState::Completed,
    ];

    /// `timeout` is listed here even though `timeout -> reassigned` is a
    /// legal transition; the escalation loop may still resurrect it.
    pub const TERMINAL: [NotificationState; 4] = [
        NotificationState::Completed,
        NotificationState::Declined,
        NotificationState::Timeout,
        NotificationState::DeadLetter,
    ];

    pub const RETRYABLE: [NotificationState; 3] = [
        NotificationState::Queued,
        NotificationState::Failed,
        NotificationState::DeferredBusy,
    ];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    pub fn is_retryable(self) -> bool {
        Self::RETRYABLE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationState::Queued => "queued",
            NotificationState::Delivering => "delivering",
            NotificationState::Delivered => "delivered",
            NotificationState::Seen => "seen",
            NotificationState::Accepted => "accepted",
            NotificationState::Declined => "declined",
            NotificationState::InProgress => "in_progress",
            NotificationState::DeferredBusy => "deferred_busy",
            NotificationState::Failed => "failed",
            NotificationState::Timeout => "timeout",
            NotificationState::DeadLetter => "dead_letter",
            NotificationState::Reassigned => "reassigned",
            NotificationState::Completed => "completed",
        }
    }

    /// Column storing the first-entry timestamp for this state.
    pub fn timestamp_column(self) -> &'static str {
        match self {
            NotificationState::Queued => "queued_at",
            NotificationState::Delivering => "delivering_at",
            NotificationState::Delivered => "delivered_at",
            NotificationState::Seen => "seen_at",
            NotificationState::Accepted => "accepted_at",
            NotificationState::Declined => "declined_at",
            NotificationState::InProgress => "in_progress_at",
            NotificationState::DeferredBusy => "deferred_busy_at",
            NotificationState::Failed => "failed_at",
            NotificationState::Timeout => "timeout_at",
            NotificationState::DeadLetter => "dead_letter_at",
            NotificationState::Reassigned => "reassigned_at",
            NotificationState::Completed => "completed_at",
        }
    }

    pub fn parse(s: &str) -> Option<NotificationState> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The notification lifecycle's transition table. `from == to` is handled
/// separately by the caller as an idempotent no-op; this only answers "is
/// `from -> to` a distinct legal move".
pub fn is_legal_transition(from: NotificationState, to: NotificationState) -> bool {
    use NotificationState::*;
    matches!(
        (from, to),
        (Queued, Delivering) | (Queued, Reassigned) | (Queued, Timeout)
        | (Delivering, Delivered) | (Delivering, DeferredBusy) | (Delivering, Failed)
            | (Delivering, Timeout) | (Delivering, DeadLetter)
        | (Delivered, Seen) | (Delivered, Accepted) | (Delivered, Declined)
            | (Delivered, DeferredBusy) | (Delivered, Timeout)
        | (Seen, Accepted) | (Seen, Declined) | (Seen, DeferredBusy) | (Seen, Timeout)
        | (Accepted, InProgress) | (Accepted, Completed) | (Accepted, DeferredBusy)
            | (Accepted, Timeout)
        | (InProgress, Completed) | (InProgress, DeferredBusy) | (InProgress, Timeout)
        | (DeferredBusy, Queued) | (DeferredBusy, Delivering) | (DeferredBusy, Accepted)
            | (DeferredBusy, InProgress) | (DeferredBusy, Timeout)
        | (Failed, Queued) | (Failed, Delivering) | (Failed, DeadLetter) | (Failed, Timeout)
        | (Timeout, Reassigned)
        | (Reassigned, Queued) | (Reassigned, Delivering)
    )
}
