use axum::extract::{Path, State};
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store::{self, Status};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBody {
    #[serde(default)]
    student_id: String,
    #[serde(default)]
    class_id: String,
    #[serde(default)]
    status: String,
}

pub async fn class_roster(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let roster = state
        .db
        .call(move |conn| store::class_attendance(conn, &class_id))
        .await?;
    Ok(Json(json!({ "attendance": roster })))
}

/// Manual mark from the dashboard. Same upsert as the camera path, so a
/// re-mark overwrites rather than duplicating.
pub async fn mark(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<MarkBody>,
) -> Result<Json<store::MarkOutcome>, ApiError> {
    if body.student_id.trim().is_empty() || body.class_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "studentId and classId are required".to_string(),
        ));
    }
    let Some(status) = Status::parse(&body.status) else {
        return Err(ApiError::Validation(
            "status must be \"present\" or \"absent\"".to_string(),
        ));
    };

    let outcome = {
        let (student_id, class_id) = (body.student_id.clone(), body.class_id.clone());
        state
            .db
            .call(move |conn| {
                store::mark_attendance(
                    conn,
                    &student_id,
                    &class_id,
                    status,
                    None,
                    Local::now().naive_local(),
                )
            })
            .await?
    };

    state.hub.broadcast(&json!({
        "type": "attendance_marked",
        "studentId": outcome.record.student_id,
        "classId": outcome.record.class_id,
        "status": outcome.record.status,
        "markedAt": outcome.record.marked_at,
        "source": "dashboard",
    }));

    Ok(Json(outcome))
}
