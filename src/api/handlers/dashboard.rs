use axum::extract::State;
use axum::Json;
use chrono::Local;
use serde_json::json;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store;

pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = Local::now().date_naive();
    let stats = state
        .db
        .call(move |conn| store::dashboard_stats(conn, today))
        .await?;
    Ok(Json(json!({
        "students": stats.students,
        "classes": stats.classes,
        "classesToday": stats.classes_today,
        "presentToday": stats.present_today,
        "absentToday": stats.absent_today,
        "liveConnections": state.hub.connection_count(),
    })))
}
