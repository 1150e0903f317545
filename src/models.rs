use crate::state_machine::NotificationState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskMessage {
    pub id: String,
    pub task_id: String,
    pub author_session_key: String,
    pub content: String,
    pub mentions: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgentAlias {
    pub alias: String,
    pub session_key: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub message_id: String,
    pub task_id: String,
    pub mention_alias: String,
    pub target_session_key: String,
    pub state: NotificationState,
    pub attempts: i64,
    pub retry_at: Option<i64>,
    pub next_check_at: Option<i64>,
    pub sla_due_at: Option<i64>,
    pub actor_session_key: Option<String>,
    pub busy_reason: Option<String>,
    pub eta_at: Option<i64>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub queued_at: Option<i64>,
    pub delivering_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub seen_at: Option<i64>,
    pub accepted_at: Option<i64>,
    pub declined_at: Option<i64>,
    pub in_progress_at: Option<i64>,
    pub deferred_busy_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub timeout_at: Option<i64>,
    pub dead_letter_at: Option<i64>,
    pub reassigned_at: Option<i64>,
    pub completed_at: Option<i64>,
}

/// `listTaskNotifications` joins in the originating message's text and
/// creation time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationWithMessage {
    pub notification: Notification,
    pub message_content: String,
    pub message_created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ThreadReadState {
    pub task_id: String,
    pub session_key: String,
    pub last_read_message_id: Option<String>,
    pub last_read_at: Option<i64>,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnreadCount {
    pub unread: i64,
    pub last_read_at: Option<i64>,
}

/// Distinguishes "field not supplied, preserve the prior value" from
/// "field explicitly set to null, clear the column" — a plain
/// `Option<T>` on a record-update struct cannot express this, since `None`
/// would be ambiguous between the two.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Omit,
    Clear,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_omit(&self) -> bool {
        matches!(self, Field::Omit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    pub id: String,
    pub state: Option<NotificationState>,
    pub attempts: Field<i64>,
    pub retry_at: Field<i64>,
    pub error: Field<String>,
    pub actor_session_key: Field<String>,
    pub busy_reason: Field<String>,
    pub eta_at: Field<i64>,
    pub next_check_at: Field<i64>,
    pub sla_due_at: Field<i64>,
    pub force: bool,
}

impl TransitionOptions {
    pub fn new(id: impl Into<String>, state: NotificationState) -> Self {
        Self {
            id: id.into(),
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListNotificationsFilter {
    pub task_id: Option<String>,
    pub state: Option<NotificationState>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimParams {
    pub limit: Option<i64>,
    pub now: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct MarkThreadReadParams {
    pub task_id: String,
    pub session_key: String,
    pub last_read_message_id: Option<String>,
    pub last_read_at: Option<i64>,
}
