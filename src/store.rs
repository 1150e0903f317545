//! Notification store: CRUD over messages, notifications, aliases, and read
//! state. All mutating operations are atomic; the single
//! `rusqlite::Connection` is guarded by the `Db`'s mutex throughout.

use crate::aliases::{resolve_mentions, upsert_agent_alias};
use crate::config::now_millis;
use crate::db::Db;
use crate::error::{StoreError, TransitionOutcome};
use crate::mentions::parse_mentions;
use crate::models::*;
use crate::state_machine::{is_legal_transition, NotificationState};
use rusqlite::{params, Connection, Row};
use std::sync::Arc;

const NOTIFICATION_COLUMNS: &str = "id, message_id, task_id, mention_alias, target_session_key, \
    state, attempts, retry_at, next_check_at, sla_due_at, actor_session_key, busy_reason, eta_at, \
    error, created_at, updated_at, queued_at, delivering_at, delivered_at, seen_at, accepted_at, \
    declined_at, in_progress_at, deferred_busy_at, failed_at, timeout_at, dead_letter_at, \
    reassigned_at, completed_at";

/// Fallible: an unparseable `state` column (e.g. after a future migration
/// that drifts out of lockstep with `NotificationState::ALL`) must surface
/// as `StoreError::InvalidStateName`, not silently resurrect the row as
/// `queued` and make a terminal row claimable again.
fn notification_from_row(row: &Row) -> Result<Notification, StoreError> {
    let state_str: String = row.get(5)?;
    let state = NotificationState::parse(&state_str)
        .ok_or_else(|| StoreError::InvalidStateName(state_str.clone()))?;
    Ok(Notification {
        id: row.get(0)?,
        message_id: row.get(1)?,
        task_id: row.get(2)?,
        mention_alias: row.get(3)?,
        target_session_key: row.get(4)?,
        state,
        attempts: row.get(6)?,
        retry_at: row.get(7)?,
        next_check_at: row.get(8)?,
        sla_due_at: row.get(9)?,
        actor_session_key: row.get(10)?,
        busy_reason: row.get(11)?,
        eta_at: row.get(12)?,
        error: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        queued_at: row.get(16)?,
        delivering_at: row.get(17)?,
        delivered_at: row.get(18)?,
        seen_at: row.get(19)?,
        accepted_at: row.get(20)?,
        declined_at: row.get(21)?,
        in_progress_at: row.get(22)?,
        deferred_busy_at: row.get(23)?,
        failed_at: row.get(24)?,
        timeout_at: row.get(25)?,
        dead_letter_at: row.get(26)?,
        reassigned_at: row.get(27)?,
        completed_at: row.get(28)?,
    })
}

fn message_from_row(row: &Row) -> rusqlite::Result<TaskMessage> {
    let mentions_json: String = row.get(4)?;
    let mentions: Vec<String> = serde_json::from_str(&mentions_json).unwrap_or_default();
    Ok(TaskMessage {
        id: row.get(0)?,
        task_id: row.get(1)?,
        author_session_key: row.get(2)?,
        content: row.get(3)?,
        mentions,
        created_at: row.get(5)?,
    })
}

pub struct NotificationStore {
    db: Arc<Db>,
}

impl NotificationStore {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    pub fn upsert_agent_alias(
        &self,
        alias: &str,
        session_key: &str,
    ) -> Result<AgentAlias, StoreError> {
        let conn = self.db.conn();
        upsert_agent_alias(&conn, alias, session_key)
    }

    /// All-or-nothing: inserts the message, resolves mentions to targets,
    /// skips the author, and inserts one `queued` notification per unique
    /// remaining target — all inside a single transaction. Rolls back
    /// wholesale on any error.
    pub fn create_task_message(
        &self,
        task_id: &str,
        author_session_key: &str,
        content: &str,
        sla_ms: Option<i64>,
    ) -> Result<TaskMessage, StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let mentions = parse_mentions(content);
        let resolved = resolve_mentions(&tx, &mentions);

        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();
        let mentions_json = serde_json::to_string(&mentions).unwrap_or_else(|_| "[]".to_string());

        tx.execute(
            "INSERT INTO task_messages (id, task_id, author_session_key, content, mentions, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![&id, task_id, author_session_key, content, &mentions_json, now],
        )?;

        for target in resolved {
            if target.session_key == author_session_key {
                continue;
            }
            let notif_id = uuid::Uuid::new_v4().to_string();
            let sla_due_at = sla_ms.map(|ms| now + ms);
            tx.execute(
                "INSERT INTO notifications (
                    id, message_id, task_id, mention_alias, target_session_key, state,
                    attempts, sla_due_at, created_at, updated_at, queued_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, 'queued', 0, ?6, ?7, ?7, ?7)
                 ON CONFLICT(message_id, target_session_key) DO NOTHING",
                params![
                    &notif_id,
                    &id,
                    task_id,
                    &target.alias,
                    &target.session_key,
                    sla_due_at,
                    now,
                ],
            )?;
        }

        tx.commit()?;

        Ok(TaskMessage {
            id,
            task_id: task_id.to_string(),
            author_session_key: author_session_key.to_string(),
            content: content.to_string(),
            mentions,
            created_at: now,
        })
    }

    pub fn list_task_messages(
        &self,
        task_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<TaskMessage>, StoreError> {
        let conn = self.db.conn();
        let limit = limit.unwrap_or(100).clamp(1, 10_000);
        let mut stmt = conn.prepare(
            "SELECT id, task_id, author_session_key, content, mentions, created_at
             FROM task_messages WHERE task_id = ?1 ORDER BY created_at ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![task_id, limit], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_task_notifications(
        &self,
        task_id: &str,
    ) -> Result<Vec<NotificationWithMessage>, StoreError> {
        let conn = self.db.conn();
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS}, m.content, m.created_at
             FROM notifications n JOIN task_messages m ON n.message_id = m.id
             WHERE n.task_id = ?1
             ORDER BY m.created_at ASC, n.created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![task_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let notification = notification_from_row(row)?;
            let message_content: String = row.get(29)?;
            let message_created_at: i64 = row.get(30)?;
            out.push(NotificationWithMessage {
                notification,
                message_content,
                message_created_at,
            });
        }
        Ok(out)
    }

    pub fn list_notifications(
        &self,
        filter: ListNotificationsFilter,
    ) -> Result<Vec<Notification>, StoreError> {
        let conn = self.db.conn();
        let limit = filter.limit.unwrap_or(200).clamp(1, 10_000);

        let mut sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(task_id) = &filter.task_id {
            sql.push_str(&format!(" AND task_id = ?{}", args.len() + 1));
            args.push(Box::new(task_id.clone()));
        }
        if let Some(state) = filter.state {
            sql.push_str(&format!(" AND state = ?{}", args.len() + 1));
            args.push(Box::new(state.as_str().to_string()));
        }
        sql.push_str(&format!(" ORDER BY created_at ASC LIMIT ?{}", args.len() + 1));
        args.push(Box::new(limit));

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let mut rows = stmt.query(refs.as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(notification_from_row(row)?);
        }
        Ok(out)
    }

    /// Selects work-ready notifications without mutating them. The
    /// subsequent `-> delivering` transition is what gives one worker
    /// exclusive ownership; see `transition_notification_state`.
    pub fn claim_ready_notifications(
        &self,
        params: ClaimParams,
    ) -> Result<Vec<Notification>, StoreError> {
        let conn = self.db.conn();
        let now = params.now.unwrap_or_else(now_millis);
        let limit = params.limit.unwrap_or(20).clamp(1, 10_000);

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE state IN ('queued', 'failed', 'deferred_busy')
               AND (retry_at IS NULL OR retry_at <= ?1)
               AND (next_check_at IS NULL OR next_check_at <= ?1)
             ORDER BY created_at ASC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params![now, limit])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(notification_from_row(row)?);
        }
        Ok(out)
    }

    /// Writes the per-state timestamp only on first entry to
    /// that state; always bumps `updated_at` on an actual transition. A
    /// same-state request is a silent no-op. An illegal transition without
    /// `force` is rejected. Concurrency: the underlying `UPDATE` is
    /// conditioned on the row still being in the state this call observed,
    /// so two racing callers can't both "win" — the loser sees `Invalid`
    /// and should treat it as a benign skip.
    pub fn transition_notification_state(
        &self,
        opts: TransitionOptions,
    ) -> Result<TransitionOutcome<Notification>, StoreError> {
        let to = opts
            .state
            .ok_or_else(|| StoreError::InvalidInput("state is required".into()))?;

        let conn = self.db.conn();
        let current = fetch_notification(&conn, &opts.id)?;
        let Some(current) = current else {
            return Ok(TransitionOutcome::NotFound);
        };

        if current.state == to {
            return Ok(TransitionOutcome::Updated(current));
        }

        if !opts.force && !is_legal_transition(current.state, to) {
            return Ok(TransitionOutcome::Invalid {
                from: current.state,
                to,
            });
        }

        let now = now_millis();
        let mut set_clauses = vec!["state = ?".to_string(), "updated_at = ?".to_string()];
        let mut args: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(to.as_str().to_string()), Box::new(now)];

        let ts_col = to.timestamp_column();
        set_clauses.push(format!("{ts_col} = COALESCE({ts_col}, ?)"));
        args.push(Box::new(now));

        push_field(&mut set_clauses, &mut args, "attempts", &opts.attempts);
        push_field(&mut set_clauses, &mut args, "retry_at", &opts.retry_at);
        push_field(&mut set_clauses, &mut args, "error", &opts.error);
        push_field(
            &mut set_clauses,
            &mut args,
            "actor_session_key",
            &opts.actor_session_key,
        );
        push_field(
            &mut set_clauses,
            &mut args,
            "busy_reason",
            &opts.busy_reason,
        );
        push_field(&mut set_clauses, &mut args, "eta_at", &opts.eta_at);
        push_field(
            &mut set_clauses,
            &mut args,
            "next_check_at",
            &opts.next_check_at,
        );
        push_field(
            &mut set_clauses,
            &mut args,
            "sla_due_at",
            &opts.sla_due_at,
        );

        let sql = format!(
            "UPDATE notifications SET {} WHERE id = ? AND state = ?",
            set_clauses.join(", ")
        );
        args.push(Box::new(opts.id.clone()));
        args.push(Box::new(current.state.as_str().to_string()));

        let refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let affected = conn.execute(&sql, refs.as_slice())?;

        if affected == 0 {
            // Lost a race: another caller moved the row between our read and
            // our write. Treat as a benign invalid-transition skip.
            let now_current = fetch_notification(&conn, &opts.id)?;
            return Ok(match now_current {
                Some(row) => TransitionOutcome::Invalid {
                    from: row.state,
                    to,
                },
                None => TransitionOutcome::NotFound,
            });
        }

        let updated = fetch_notification(&conn, &opts.id)?
            .expect("row just updated must still exist");
        Ok(TransitionOutcome::Updated(updated))
    }

    pub fn mark_thread_read_state(
        &self,
        params: MarkThreadReadParams,
    ) -> Result<ThreadReadState, StoreError> {
        let conn = self.db.conn();
        let now = now_millis();
        let last_read_at = params.last_read_at.unwrap_or(now);

        conn.execute(
            "INSERT INTO thread_read_state (task_id, session_key, last_read_message_id, last_read_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(task_id, session_key) DO UPDATE SET
                last_read_message_id = excluded.last_read_message_id,
                last_read_at = excluded.last_read_at,
                updated_at = excluded.updated_at",
            rusqlite::params![
                params.task_id,
                params.session_key,
                params.last_read_message_id,
                last_read_at,
                now
            ],
        )?;

        Ok(ThreadReadState {
            task_id: params.task_id,
            session_key: params.session_key,
            last_read_message_id: params.last_read_message_id,
            last_read_at: Some(last_read_at),
            updated_at: now,
        })
    }

    /// Unread count for `session_key` in `task_id` = messages authored by
    /// someone else whose `created_at` strictly exceeds the viewer's
    /// `last_read_at`, or all such messages when no marker exists.
    pub fn get_thread_unread_count(
        &self,
        task_id: &str,
        session_key: &str,
    ) -> Result<UnreadCount, StoreError> {
        let conn = self.db.conn();

        let last_read_at: Option<i64> = conn
            .query_row(
                "SELECT last_read_at FROM thread_read_state WHERE task_id = ?1 AND session_key = ?2",
                params![task_id, session_key],
                |row| row.get(0),
            )
            .ok();

        let unread: i64 = match last_read_at {
            Some(cutoff) => conn.query_row(
                "SELECT COUNT(*) FROM task_messages
                 WHERE task_id = ?1 AND author_session_key != ?2 AND created_at > ?3",
                params![task_id, session_key, cutoff],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM task_messages
                 WHERE task_id = ?1 AND author_session_key != ?2",
                params![task_id, session_key],
                |row| row.get(0),
            )?,
        };

        Ok(UnreadCount {
            unread,
            last_read_at,
        })
    }

    /// Plain text lookup used by the delivery worker's `getMessageText`
    /// capability default implementation.
    pub fn get_message_text(&self, message_id: &str) -> Option<String> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT content FROM task_messages WHERE id = ?1",
            params![message_id],
            |row| row.get(0),
        )
        .ok()
    }
}

fn fetch_notification(conn: &Connection, id: &str) -> Result<Option<Notification>, StoreError> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(notification_from_row(row)?)),
        None => Ok(None),
    }
}

fn push_field<T: rusqlite::types::ToSql + Clone + 'static>(
    set_clauses: &mut Vec<String>,
    args: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
    column: &str,
    field: &Field<T>,
) {
    match field {
        Field::Omit => {}
        Field::Clear => {
            set_clauses.push(format!("{column} = NULL"));
        }
        Field::Set(v) => {
            set_clauses.push(format!("{column} = ?"));
            args.push(Box::new(v.clone()));
        }
    }
}
