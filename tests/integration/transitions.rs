use super::common::test_store;
use mission_control::models::{Field, TransitionOptions};
use mission_control::state_machine::NotificationState;

fn seeded_notification_id(store: &mission_control::store::NotificationStore) -> String {
    store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();
    store
        .create_task_message("task-1", "agent:dev:main", "@Vision please check", None)
        .unwrap();
    store.list_task_notifications("task-1").unwrap()[0]
        .notification
        .id
        .clone()
}

#[test]
fn illegal_transition_without_force_leaves_row_unchanged() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    let outcome = store
        .transition_notification_state(TransitionOptions::new(&id, NotificationState::Completed))
        .unwrap();
    assert!(!outcome.is_updated());

    let notifications = store.list_task_notifications("task-1").unwrap();
    assert_eq!(
        notifications[0].notification.state,
        NotificationState::Queued
    );
}

#[test]
fn forced_illegal_transition_goes_through() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    let outcome = store
        .transition_notification_state(
            TransitionOptions::new(&id, NotificationState::Completed).forced(),
        )
        .unwrap();
    assert!(outcome.is_updated());
}

#[test]
fn per_state_timestamp_is_set_exactly_once() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    let first = store
        .transition_notification_state(TransitionOptions::new(&id, NotificationState::Delivering))
        .unwrap()
        .updated()
        .unwrap();
    let delivering_at_first = first.delivering_at;
    assert!(delivering_at_first.is_some());

    // Move away and back to delivering via a legal path, then force back in.
    store
        .transition_notification_state(TransitionOptions::new(&id, NotificationState::Failed))
        .unwrap();
    let second = store
        .transition_notification_state(
            TransitionOptions::new(&id, NotificationState::Delivering).forced(),
        )
        .unwrap()
        .updated()
        .unwrap();

    assert_eq!(second.delivering_at, delivering_at_first);
}

#[test]
fn same_state_transition_is_a_no_op() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    let before = store
        .transition_notification_state(TransitionOptions::new(&id, NotificationState::Queued))
        .unwrap()
        .updated()
        .unwrap();
    let after = store
        .transition_notification_state(TransitionOptions::new(&id, NotificationState::Queued))
        .unwrap()
        .updated()
        .unwrap();

    assert_eq!(before.updated_at, after.updated_at);
}

#[test]
fn unknown_id_returns_not_found() {
    let store = test_store();
    let outcome = store
        .transition_notification_state(TransitionOptions::new(
            "does-not-exist",
            NotificationState::Delivering,
        ))
        .unwrap();
    assert!(matches!(
        outcome,
        mission_control::error::TransitionOutcome::NotFound
    ));
}

#[test]
fn clear_field_nulls_out_the_column() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    let mut to_delivering = TransitionOptions::new(&id, NotificationState::Delivering);
    to_delivering.retry_at = Field::Clear;
    let delivering = store
        .transition_notification_state(to_delivering)
        .unwrap()
        .updated()
        .unwrap();
    assert!(delivering.retry_at.is_none());

    let mut to_failed = TransitionOptions::new(&id, NotificationState::Failed);
    to_failed.retry_at = Field::Set(999);
    store.transition_notification_state(to_failed).unwrap();

    let mut to_queued = TransitionOptions::new(&id, NotificationState::Queued);
    to_queued.retry_at = Field::Clear;
    let queued = store
        .transition_notification_state(to_queued)
        .unwrap()
        .updated()
        .unwrap();
    assert!(queued.retry_at.is_none());
}

#[test]
fn ack_ladder_populates_each_timestamp_without_overwrite() {
    let store = test_store();
    let id = seeded_notification_id(&store);

    for state in [
        NotificationState::Delivering,
        NotificationState::Delivered,
        NotificationState::Seen,
        NotificationState::Accepted,
        NotificationState::InProgress,
        NotificationState::Completed,
    ] {
        let row = store
            .transition_notification_state(TransitionOptions::new(&id, state))
            .unwrap()
            .updated()
            .unwrap();
        assert_eq!(row.state, state);
    }

    let finished = store.list_task_notifications("task-1").unwrap().remove(0).notification;
    assert!(finished.delivering_at.is_some());
    assert!(finished.delivered_at.is_some());
    assert!(finished.seen_at.is_some());
    assert!(finished.accepted_at.is_some());
    assert!(finished.in_progress_at.is_some());
    assert!(finished.completed_at.is_some());
}
