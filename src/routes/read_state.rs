use crate::models::{MarkThreadReadParams, UnreadCount};
use crate::store::NotificationStore;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Deserialize;

#[get("/api/v1/tasks/<task_id>/unread/<session_key>")]
pub fn get_thread_unread(
    store: &State<std::sync::Arc<NotificationStore>>,
    task_id: &str,
    session_key: &str,
) -> Result<Json<UnreadCount>, (Status, Json<serde_json::Value>)> {
    store
        .get_thread_unread_count(task_id, session_key)
        .map(Json)
        .map_err(|e| {
            (
                Status::InternalServerError,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        })
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub last_read_message_id: Option<String>,
    pub last_read_at: Option<i64>,
}

#[post(
    "/api/v1/tasks/<task_id>/unread/<session_key>",
    format = "json",
    data = "<body>"
)]
pub fn mark_thread_read(
    store: &State<std::sync::Arc<NotificationStore>>,
    task_id: &str,
    session_key: &str,
    body: Option<Json<MarkReadBody>>,
) -> Result<Json<crate::models::ThreadReadState>, (Status, Json<serde_json::Value>)> {
    let body = body.map(|b| b.into_inner()).unwrap_or(MarkReadBody {
        last_read_message_id: None,
        last_read_at: None,
    });

    store
        .mark_thread_read_state(MarkThreadReadParams {
            task_id: task_id.to_string(),
            session_key: session_key.to_string(),
            last_read_message_id: body.last_read_message_id,
            last_read_at: body.last_read_at,
        })
        .map(Json)
        .map_err(|e| {
            (
                Status::InternalServerError,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        })
}
