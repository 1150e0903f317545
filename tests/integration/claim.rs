use super::common::test_store;
use mission_control::models::{ClaimParams, Field, TransitionOptions};
use mission_control::state_machine::NotificationState;

#[test]
fn claim_returns_only_queued_failed_and_deferred_busy_rows_past_their_retry_and_check_times() {
    let store = test_store();
    store.upsert_agent_alias("Vision", "agent:vision:main").unwrap();
    store.upsert_agent_alias("Ops", "agent:ops:main").unwrap();
    store.upsert_agent_alias("Helm", "agent:helm:main").unwrap();

    store
        .create_task_message("task-1", "agent:dev:main", "@Vision check this", None)
        .unwrap();
    store
        .create_task_message("task-1", "agent:dev:main", "@Ops check this too", None)
        .unwrap();
    store
        .create_task_message("task-1", "agent:dev:main", "@Helm and this", None)
        .unwrap();

    let notifications = store.list_task_notifications("task-1").unwrap();
    let vision_id = notifications
        .iter()
        .find(|n| n.notification.target_session_key == "agent:vision:main")
        .unwrap()
        .notification
        .id
        .clone();
    let ops_id = notifications
        .iter()
        .find(|n| n.notification.target_session_key == "agent:ops:main")
        .unwrap()
        .notification
        .id
        .clone();
    let helm_id = notifications
        .iter()
        .find(|n| n.notification.target_session_key == "agent:helm:main")
        .unwrap()
        .notification
        .id
        .clone();

    // Ops: move into delivering so it's no longer claimable.
    store
        .transition_notification_state(TransitionOptions::new(&ops_id, NotificationState::Delivering))
        .unwrap();

    // Helm: fail with a retry_at far in the future, so it's not claimable yet.
    let mut fail_opts = TransitionOptions::new(&helm_id, NotificationState::Delivering);
    store.transition_notification_state(fail_opts.clone()).unwrap();
    fail_opts = TransitionOptions::new(&helm_id, NotificationState::Failed);
    fail_opts.retry_at = Field::Set(9_999_999_999_999);
    store.transition_notification_state(fail_opts).unwrap();

    let claimed = store
        .claim_ready_notifications(ClaimParams {
            limit: None,
            now: Some(1_000_000),
        })
        .unwrap();

    let claimed_ids: Vec<_> = claimed.iter().map(|n| n.id.clone()).collect();
    assert!(claimed_ids.contains(&vision_id));
    assert!(!claimed_ids.contains(&ops_id));
    assert!(!claimed_ids.contains(&helm_id));
}

#[test]
fn claim_respects_the_limit() {
    let store = test_store();
    for i in 0..5 {
        store
            .upsert_agent_alias(&format!("Agent{i}"), &format!("agent:a{i}:main"))
            .unwrap();
        store
            .create_task_message("task-1", "agent:dev:main", &format!("@Agent{i} hi"), None)
            .unwrap();
    }

    let claimed = store
        .claim_ready_notifications(ClaimParams {
            limit: Some(2),
            now: Some(1_000_000),
        })
        .unwrap();
    assert_eq!(claimed.len(), 2);
}
