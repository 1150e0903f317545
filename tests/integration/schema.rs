use mission_control::db::Db;
use mission_control::store::NotificationStore;
use std::sync::Arc;

/// `ensureSchema` must be safe to invoke at every open and must never lose
/// data that was already committed to the file.
#[test]
fn reopening_a_file_backed_db_is_idempotent_and_preserves_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mission_control.db");
    let db_path = db_path.to_str().unwrap();

    {
        let db = Arc::new(Db::new(db_path));
        let store = NotificationStore::new(db);
        store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();
        store
            .create_task_message("task-1", "agent:dev:main", "hello @Vision", None)
            .unwrap();
    }

    // Reopen against the same file: migrate() runs again and must not error
    // on already-present tables/indexes, and prior rows must still be there.
    let db = Arc::new(Db::new(db_path));
    let store = NotificationStore::new(db);
    let messages = store.list_task_messages("task-1", None).unwrap();
    assert_eq!(messages.len(), 1);

    let notifications = store.list_task_notifications("task-1").unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].notification.target_session_key, "agent:vision:main");
}

#[test]
fn resolve_db_path_creates_the_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested").join("sub");
    let db_path = nested.join("mc.db");

    let resolved = mission_control::config::resolve_db_path(Some(db_path.to_str().unwrap()));
    assert_eq!(resolved, db_path.to_str().unwrap());
    assert!(nested.is_dir());
}
