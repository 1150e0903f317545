use crate::store::NotificationStore;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, put, delete, patch, State};

/// Non-GET methods on the notifications list route return 405, not the
/// framework's default 404 — an explicit per-method route per path, same
/// style as the other read-only routes in this module.
#[get("/api/v1/tasks/<task_id>/notifications")]
pub fn get_task_notifications(
    store: &State<std::sync::Arc<NotificationStore>>,
    task_id: &str,
) -> Result<Json<Vec<crate::models::NotificationWithMessage>>, (Status, Json<serde_json::Value>)> {
    store
        .list_task_notifications(task_id)
        .map(Json)
        .map_err(|e| {
            (
                Status::InternalServerError,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        })
}

#[post("/api/v1/tasks/<_task_id>/notifications")]
pub fn notifications_post_not_allowed(_task_id: &str) -> Status {
    Status::MethodNotAllowed
}

#[put("/api/v1/tasks/<_task_id>/notifications")]
pub fn notifications_put_not_allowed(_task_id: &str) -> Status {
    Status::MethodNotAllowed
}

#[delete("/api/v1/tasks/<_task_id>/notifications")]
pub fn notifications_delete_not_allowed(_task_id: &str) -> Status {
    Status::MethodNotAllowed
}

#[patch("/api/v1/tasks/<_task_id>/notifications")]
pub fn notifications_patch_not_allowed(_task_id: &str) -> Status {
    Status::MethodNotAllowed
}
