use crate::store::NotificationStore;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, State};

#[get("/api/v1/tasks/<task_id>/messages?<limit>")]
pub fn get_task_messages(
    store: &State<std::sync::Arc<NotificationStore>>,
    task_id: &str,
    limit: Option<i64>,
) -> Result<Json<Vec<crate::models::TaskMessage>>, (Status, Json<serde_json::Value>)> {
    store
        .list_task_messages(task_id, limit)
        .map(Json)
        .map_err(|e| {
            (
                Status::InternalServerError,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        })
}
