//! Delivery worker: claims ready notifications and drives each through
//! send + outcome interpretation, one tick at a time. The actual transport
//! is injected via `SendViaSessions` so this module never reaches into a
//! specific session/transport implementation directly.

use crate::config::{now_millis, WorkerConfig};
use crate::error::StoreError;
use crate::models::{Notification, TransitionOptions};
use crate::state_machine::NotificationState;
use crate::store::NotificationStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_ACTOR: &str = "system:delivery-worker";

/// What the worker hands the transport layer for one delivery attempt.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub notification_id: String,
    pub task_id: String,
    pub message_id: String,
    pub mention_alias: String,
    pub target_session_key: String,
    pub message: String,
}

/// What the transport layer hands back. `status` carries the fine-grained
/// outcome; `ok` is the coarse success/fail the worker falls back on when
/// `status` doesn't name one of the recognized non-delivered cases.
///
/// `eta_at` (when the target is expected back) and `next_check_at` (when the
/// worker should re-poll) are independent: a transport may know the agent
/// returns at one time but want the worker to re-check at another.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    pub ok: bool,
    pub status: Option<String>,
    pub actor_session_key: Option<String>,
    pub busy_reason: Option<String>,
    pub eta_at: Option<i64>,
    pub next_check_at: Option<i64>,
    pub error: Option<String>,
}

/// Injected capability: deliver a message to a target session, expressed as
/// a trait so tests can substitute a fake transport.
#[async_trait]
pub trait SendViaSessions: Send + Sync {
    async fn send(&self, request: SendRequest) -> SendOutcome;
}

/// Injected capability: resolve a message id to its text. Defaults to the
/// store's own lookup; a trait so callers can short-circuit without a
/// round trip when the text is already in hand.
#[async_trait]
pub trait GetMessageText: Send + Sync {
    async fn get_message_text(&self, message_id: &str) -> Option<String>;
}

pub struct StoreMessageText {
    pub store: Arc<NotificationStore>,
}

#[async_trait]
impl GetMessageText for StoreMessageText {
    async fn get_message_text(&self, message_id: &str) -> Option<String> {
        self.store.get_message_text(message_id)
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TickCounters {
    pub polled: usize,
    pub processed: usize,
    pub delivered: usize,
    pub deferred_busy: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub dead_lettered: usize,
    pub escalated: usize,
}

pub struct DeliveryWorker {
    store: Arc<NotificationStore>,
    sender: Arc<dyn SendViaSessions>,
    message_text: Arc<dyn GetMessageText>,
    config: WorkerConfig,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<NotificationStore>,
        sender: Arc<dyn SendViaSessions>,
        message_text: Arc<dyn GetMessageText>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            sender,
            message_text,
            config,
        }
    }

    /// Runs one full tick: claim, then process each claimed row in order.
    /// `now` defaults to the system clock; tests pass an explicit value for
    /// determinism.
    pub async fn tick(&self, now: Option<i64>) -> Result<(TickCounters, Vec<Notification>), StoreError> {
        let now = now.unwrap_or_else(now_millis);
        let batch = self.store.claim_ready_notifications(crate::models::ClaimParams {
            limit: Some(self.config.limit),
            now: Some(now),
        })?;

        let mut counters = TickCounters {
            polled: batch.len(),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(batch.len());

        for row in batch {
            counters.processed += 1;

            if let Some(sla_due_at) = row.sla_due_at {
                if sla_due_at <= now {
                    if let Some(escalated) = self.escalate_sla_breach(&row, now)? {
                        counters.escalated += 1;
                        results.push(escalated);
                    }
                    continue;
                }
            }

            match self.deliver_one(&row, now).await? {
                Some((final_row, outcome_kind)) => {
                    match outcome_kind {
                        OutcomeKind::Delivered => counters.delivered += 1,
                        OutcomeKind::DeferredBusy => counters.deferred_busy += 1,
                        OutcomeKind::Timeout => counters.timed_out += 1,
                        OutcomeKind::Failed => counters.failed += 1,
                        OutcomeKind::DeadLettered => counters.dead_lettered += 1,
                    }
                    results.push(final_row);
                }
                None => {
                    // Claim lost the race; benign skip.
                }
            }
        }

        Ok((counters, results))
    }

    /// Step 3a: timeout -> (forced) reassigned -> (forced) queued, recycling
    /// the same row for another attempt.
    fn escalate_sla_breach(
        &self,
        row: &Notification,
        now: i64,
    ) -> Result<Option<Notification>, StoreError> {
        let mut opts = TransitionOptions::new(&row.id, NotificationState::Timeout);
        opts.actor_session_key = crate::models::Field::Set(SYSTEM_ACTOR.to_string());
        opts.error = crate::models::Field::Set("SLA breach".to_string());
        let timed_out = self.store.transition_notification_state(opts)?;
        if !timed_out.is_updated() {
            return Ok(None);
        }

        let reassigned = self
            .store
            .transition_notification_state(
                TransitionOptions::new(&row.id, NotificationState::Reassigned).forced(),
            )?;
        if !reassigned.is_updated() {
            return Ok(reassigned.updated());
        }

        let mut requeue = TransitionOptions::new(&row.id, NotificationState::Queued).forced();
        requeue.retry_at = crate::models::Field::Set(now);
        let requeued = self.store.transition_notification_state(requeue)?;
        Ok(requeued.updated())
    }

    async fn deliver_one(
        &self,
        row: &Notification,
        now: i64,
    ) -> Result<Option<(Notification, OutcomeKind)>, StoreError> {
        let mut claim = TransitionOptions::new(&row.id, NotificationState::Delivering);
        claim.attempts = crate::models::Field::Set(row.attempts + 1);
        claim.retry_at = crate::models::Field::Clear;
        claim.error = crate::models::Field::Clear;
        let claimed = self.store.transition_notification_state(claim)?;
        let Some(claimed) = claimed.updated() else {
            return Ok(None);
        };

        let message = self
            .message_text
            .get_message_text(&claimed.message_id)
            .await
            .unwrap_or_default();

        let request = SendRequest {
            notification_id: claimed.id.clone(),
            task_id: claimed.task_id.clone(),
            message_id: claimed.message_id.clone(),
            mention_alias: claimed.mention_alias.clone(),
            target_session_key: claimed.target_session_key.clone(),
            message,
        };

        let outcome = self.sender.send(request).await;
        self.apply_outcome(&claimed, outcome, now)
    }

    fn apply_outcome(
        &self,
        row: &Notification,
        outcome: SendOutcome,
        now: i64,
    ) -> Result<Option<(Notification, OutcomeKind)>, StoreError> {
        let actor = outcome
            .actor_session_key
            .clone()
            .unwrap_or_else(|| row.target_session_key.clone());

        let (to, kind) = match outcome.status.as_deref() {
            Some("deferred_busy") => (NotificationState::DeferredBusy, OutcomeKind::DeferredBusy),
            Some("timeout") => (NotificationState::Timeout, OutcomeKind::Timeout),
            _ if outcome.ok => (NotificationState::Delivered, OutcomeKind::Delivered),
            _ => {
                if row.attempts >= self.config.max_attempts {
                    (NotificationState::DeadLetter, OutcomeKind::DeadLettered)
                } else {
                    (NotificationState::Failed, OutcomeKind::Failed)
                }
            }
        };

        let mut opts = TransitionOptions::new(&row.id, to);
        opts.actor_session_key = crate::models::Field::Set(actor);

        match to {
            NotificationState::DeferredBusy => {
                let next_check_at = outcome
                    .next_check_at
                    .unwrap_or(now + self.config.retry_delay_ms);
                opts.busy_reason = outcome
                    .busy_reason
                    .map(crate::models::Field::Set)
                    .unwrap_or(crate::models::Field::Omit);
                opts.eta_at = outcome
                    .eta_at
                    .map(crate::models::Field::Set)
                    .unwrap_or(crate::models::Field::Omit);
                opts.next_check_at = crate::models::Field::Set(next_check_at);
                opts.retry_at = crate::models::Field::Set(next_check_at);
            }
            NotificationState::Delivered => {
                opts.retry_at = crate::models::Field::Clear;
                opts.error = crate::models::Field::Clear;
            }
            NotificationState::Timeout => {
                opts.retry_at = crate::models::Field::Clear;
                if let Some(err) = outcome.error {
                    opts.error = crate::models::Field::Set(err);
                }
            }
            NotificationState::Failed => {
                opts.retry_at = crate::models::Field::Set(now + self.config.retry_delay_ms);
                if let Some(err) = outcome.error {
                    opts.error = crate::models::Field::Set(err);
                }
            }
            NotificationState::DeadLetter => {
                opts.retry_at = crate::models::Field::Clear;
                if let Some(err) = outcome.error {
                    opts.error = crate::models::Field::Set(err);
                }
            }
            _ => {}
        }

        let result = self.store.transition_notification_state(opts)?;
        Ok(result.updated().map(|n| (n, kind)))
    }
}

#[derive(Debug, Clone, Copy)]
enum OutcomeKind {
    Delivered,
    DeferredBusy,
    Timeout,
    Failed,
    DeadLettered,
}

/// Background loop: a fixed startup delay, then a periodic tick on its own
/// interval. Driven by the same `Db` the HTTP routes use, so claims are
/// visible immediately.
pub fn spawn_delivery_loop(worker: Arc<DeliveryWorker>, interval: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;

        loop {
            match worker.tick(None).await {
                Ok((counters, _)) => {
                    if counters.processed > 0 {
                        println!(
                            "delivery worker: polled={} processed={} delivered={} deferred_busy={} failed={} timed_out={} dead_lettered={} escalated={}",
                            counters.polled,
                            counters.processed,
                            counters.delivered,
                            counters.deferred_busy,
                            counters.failed,
                            counters.timed_out,
                            counters.dead_lettered,
                            counters.escalated,
                        );
                    }
                }
                Err(e) => eprintln!("delivery worker: tick failed: {e}"),
            }
            tokio::time::sleep(interval).await;
        }
    });
}

/// Convenience constructor used by routes/tests that just need a JSON
/// envelope for a send result without building a `SendOutcome` by hand.
pub fn send_outcome_from_json(value: Value) -> SendOutcome {
    SendOutcome {
        ok: value.get("ok").and_then(Value::as_bool).unwrap_or(false),
        status: value
            .get("status")
            .and_then(Value::as_str)
            .map(String::from),
        actor_session_key: value
            .get("actor_session_key")
            .and_then(Value::as_str)
            .map(String::from),
        busy_reason: value
            .get("busy_reason")
            .and_then(Value::as_str)
            .map(String::from),
        eta_at: value.get("eta_at").and_then(Value::as_i64),
        next_check_at: value.get("next_check_at").and_then(Value::as_i64),
        error: value.get("error").and_then(Value::as_str).map(String::from),
    }
}
