//! ステータス照会 - `GET /tasks/{task_id}`

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::AppState;
use crate::domain::{TaskId, TaskStatus};

/// Returns the recorded row, or `404` with status `UNKNOWN`.
pub async fn status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    let task_id = TaskId::new(task_id);
    match state.app().recorder().lookup(&task_id).await {
        Some(row) => (StatusCode::OK, Json(json!({
            "id": row.id.as_uuid(),
            "task_id": row.task_id,
            "task_name": row.task_name,
            "function_path": row.function_path,
            "status": row.status,
            "args": row.args,
            "kwargs": row.kwargs,
            "result": row.result,
            "traceback": row.traceback,
            "date_created": row.date_created,
            "date_done": row.date_done,
        })))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "task_id": task_id, "status": TaskStatus::Unknown })),
        )
            .into_response(),
    }
}
