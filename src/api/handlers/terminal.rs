use axum::extract::{Path, State};
use axum::Json;
use chrono::Local;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::schedule::{self, DEFAULT_LOOKAHEAD_MINUTES};
use crate::store;

/// Unauthenticated endpoint for unattended terminals: which class should
/// the camera be marking right now, or soon?
pub async fn current_class(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let now = Local::now().naive_local();
    let today = now.date();
    let classes = state
        .db
        .call(move |conn| store::classes_on_date(conn, today))
        .await?;

    if let Some(class) = schedule::current_class(&classes, now) {
        return Ok(Json(json!({ "status": "active", "class": class })));
    }
    if let Some(class) = schedule::upcoming_class(&classes, now, DEFAULT_LOOKAHEAD_MINUTES) {
        let starts_in = (class.start_time - now.time()).num_minutes();
        return Ok(Json(json!({
            "status": "upcoming",
            "class": class,
            "startsInMinutes": starts_in,
        })));
    }
    Ok(Json(json!({ "status": "none", "class": null })))
}

pub async fn todays_classes(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = Local::now().date_naive();
    let classes = state
        .db
        .call(move |conn| store::classes_on_date(conn, today))
        .await?;
    Ok(Json(json!({ "classes": classes })))
}

pub async fn class_by_id(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<store::Class>, ApiError> {
    let class = state
        .db
        .call(move |conn| store::get_class(conn, &class_id))
        .await?;
    Ok(Json(class))
}
