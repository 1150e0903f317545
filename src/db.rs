use rusqlite::Connection;
use std::sync::Mutex;

/// Single-connection store handle. All mutating operations take the lock for
/// a short write transaction; reads share the same mutex (one `Connection`
/// per process).
pub struct Db {
    pub conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("Failed to set pragmas");
        let db = Db {
            conn: Mutex::new(conn),
        };
        db.migrate();
        db
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Idempotent: safe to call at every open. Forward-only — never drops or
    /// renames a column. `ALTER TABLE ... ADD COLUMN` failures for
    /// already-present columns are swallowed via `.ok()`.
    fn migrate(&self) {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS task_messages (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                author_session_key TEXT NOT NULL,
                content TEXT NOT NULL,
                mentions TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_task_messages_task_created
                ON task_messages(task_id, created_at);

            CREATE TABLE IF NOT EXISTS agent_aliases (
                alias TEXT PRIMARY KEY,
                session_key TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL REFERENCES task_messages(id) ON DELETE CASCADE,
                task_id TEXT NOT NULL,
                mention_alias TEXT NOT NULL,
                target_session_key TEXT NOT NULL,
                state TEXT NOT NULL CHECK(state IN (
                    'queued', 'delivering', 'delivered', 'seen', 'accepted',
                    'declined', 'in_progress', 'deferred_busy', 'failed',
                    'timeout', 'dead_letter', 'reassigned', 'completed'
                )),
                attempts INTEGER NOT NULL DEFAULT 0,
                retry_at INTEGER,
                next_check_at INTEGER,
                sla_due_at INTEGER,
                actor_session_key TEXT,
                eta_at INTEGER,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                queued_at INTEGER,
                delivering_at INTEGER,
                delivered_at INTEGER,
                seen_at INTEGER,
                accepted_at INTEGER,
                declined_at INTEGER,
                in_progress_at INTEGER,
                deferred_busy_at INTEGER,
                failed_at INTEGER,
                timeout_at INTEGER,
                dead_letter_at INTEGER,
                reassigned_at INTEGER,
                completed_at INTEGER,
                UNIQUE(message_id, target_session_key)
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_task_created
                ON notifications(task_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_notifications_state_retry_created
                ON notifications(state, retry_at, created_at);
            CREATE INDEX IF NOT EXISTS idx_notifications_target_state_created
                ON notifications(target_session_key, state, created_at);
            CREATE INDEX IF NOT EXISTS idx_notifications_claim
                ON notifications(state, retry_at, next_check_at, created_at);

            CREATE TABLE IF NOT EXISTS thread_read_state (
                task_id TEXT NOT NULL,
                session_key TEXT NOT NULL,
                last_read_message_id TEXT REFERENCES task_messages(id) ON DELETE SET NULL,
                last_read_at INTEGER,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (task_id, session_key)
            );
            CREATE INDEX IF NOT EXISTS idx_thread_read_state_task_session_updated
                ON thread_read_state(task_id, session_key, updated_at);
            ",
        )
        .expect("Failed to run migrations");

        // Backfill columns added after the initial schema, in a fixed order.
        // Already-present-column errors are swallowed; this list only grows.
        // busy_reason: the transport-supplied reason string for a deferred_busy
        // outcome, added after notifications shipped without it.
        conn.execute_batch("ALTER TABLE notifications ADD COLUMN busy_reason TEXT;")
            .ok();
    }
}
