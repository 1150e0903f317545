use super::common::test_store;
use mission_control::state_machine::NotificationState;

#[test]
fn fan_out_is_one_notification_per_unique_non_author_target() {
    let store = test_store();
    store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();
    store.upsert_agent_alias("Ops", "agent:ops:main").unwrap();

    store
        .create_task_message(
            "task-1",
            "agent:dev:main",
            "please review @Vision and loop in @Ops",
            None,
        )
        .unwrap();

    let notifications = store.list_task_notifications("task-1").unwrap();
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .all(|n| n.notification.state == NotificationState::Queued));

    let mut targets: Vec<_> = notifications
        .iter()
        .map(|n| n.notification.target_session_key.clone())
        .collect();
    targets.sort();
    assert_eq!(targets, vec!["agent:ops:main", "agent:vision:main"]);
}

#[test]
fn self_mention_is_excluded() {
    let store = test_store();
    store.upsert_agent_alias("Dev", "agent:dev:main").unwrap();

    store
        .create_task_message("task-1", "agent:dev:main", "noting this myself @Dev", None)
        .unwrap();

    let notifications = store.list_task_notifications("task-1").unwrap();
    assert!(notifications.is_empty());
}

#[test]
fn duplicate_mentions_collapse_to_one_notification() {
    let store = test_store();
    store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();

    store
        .create_task_message(
            "task-1",
            "agent:dev:main",
            "@Vision please take a look, @Vision this is urgent",
            None,
        )
        .unwrap();

    let notifications = store.list_task_notifications("task-1").unwrap();
    assert_eq!(notifications.len(), 1);
}

#[test]
fn message_is_created_even_when_no_mentions_resolve() {
    let store = test_store();

    let message = store
        .create_task_message("task-1", "agent:dev:main", "no mentions here", None)
        .unwrap();

    assert_eq!(message.mentions.len(), 0);
    let stored = store.list_task_messages("task-1", None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "no mentions here");
}
