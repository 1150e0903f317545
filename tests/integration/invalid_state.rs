use super::common::test_store_with_db;
use mission_control::error::StoreError;

/// A `state` column value the Rust enum can't parse (e.g. a future migration
/// that drifts out of lockstep with `NotificationState::ALL`, or storage
/// corruption bypassing the `CHECK` constraint) must surface as
/// `StoreError::InvalidStateName`, never silently resurrect the row as
/// `queued`.
#[test]
fn unparseable_state_column_surfaces_as_invalid_state_name_error() {
    let (store, db) = test_store_with_db();
    store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();
    store
        .create_task_message("task-1", "agent:dev:main", "@Vision please check", None)
        .unwrap();

    let id = store.list_task_notifications("task-1").unwrap()[0]
        .notification
        .id
        .clone();

    {
        let conn = db.conn();
        // Bypass the `CHECK(state IN (...))` constraint to simulate a row
        // whose state drifted out of sync with the Rust-level enum.
        conn.execute_batch(&format!(
            "PRAGMA ignore_check_constraints = ON;
             UPDATE notifications SET state = 'bogus_state' WHERE id = '{id}';"
        ))
        .unwrap();
    }

    let err = store.list_task_notifications("task-1").unwrap_err();
    assert!(matches!(err, StoreError::InvalidStateName(s) if s == "bogus_state"));

    // `list_notifications` has no state restriction, so it reaches the
    // corrupted row too. (`claim_ready_notifications`, by contrast, filters
    // on `state IN ('queued', 'failed', 'deferred_busy')` in SQL — an
    // unrecognized value is excluded before it ever reaches Rust, which is
    // the claim query's point: a drifted row simply isn't claimable.)
    let err = store.list_notifications(Default::default()).unwrap_err();
    assert!(matches!(err, StoreError::InvalidStateName(s) if s == "bogus_state"));
}
