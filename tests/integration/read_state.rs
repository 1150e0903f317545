use super::common::test_store;
use mission_control::models::MarkThreadReadParams;

/// S6 read-state roundtrip.
#[test]
fn unread_count_decreases_as_the_read_marker_advances() {
    let store = test_store();

    let first = store
        .create_task_message("task-1", "agent:dev:main", "first update", None)
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = store
        .create_task_message("task-1", "agent:dev:main", "second update", None)
        .unwrap();

    let initial = store.get_thread_unread_count("task-1", "agent:viewer:main").unwrap();
    assert_eq!(initial.unread, 2);

    store
        .mark_thread_read_state(MarkThreadReadParams {
            task_id: "task-1".to_string(),
            session_key: "agent:viewer:main".to_string(),
            last_read_message_id: Some(first.id.clone()),
            last_read_at: Some(first.created_at),
        })
        .unwrap();

    let after_first = store.get_thread_unread_count("task-1", "agent:viewer:main").unwrap();
    assert_eq!(after_first.unread, 1);

    store
        .mark_thread_read_state(MarkThreadReadParams {
            task_id: "task-1".to_string(),
            session_key: "agent:viewer:main".to_string(),
            last_read_message_id: Some(second.id.clone()),
            last_read_at: Some(second.created_at),
        })
        .unwrap();

    let after_second = store.get_thread_unread_count("task-1", "agent:viewer:main").unwrap();
    assert_eq!(after_second.unread, 0);
}

#[test]
fn own_messages_never_count_as_unread() {
    let store = test_store();
    store
        .create_task_message("task-1", "agent:viewer:main", "talking to myself", None)
        .unwrap();

    let unread = store.get_thread_unread_count("task-1", "agent:viewer:main").unwrap();
    assert_eq!(unread.unread, 0);
}

#[test]
fn unread_with_no_marker_counts_all_other_authored_messages() {
    let store = test_store();
    store
        .create_task_message("task-1", "agent:dev:main", "a", None)
        .unwrap();
    store
        .create_task_message("task-1", "agent:dev:main", "b", None)
        .unwrap();

    let unread = store.get_thread_unread_count("task-1", "agent:viewer:main").unwrap();
    assert_eq!(unread.unread, 2);
    assert!(unread.last_read_at.is_none());
}
