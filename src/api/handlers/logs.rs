use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store;

const LOG_LIMIT: i64 = 1000;

#[derive(Deserialize)]
pub struct LogsBody {
    #[serde(default)]
    password: String,
    #[serde(default)]
    filter: Option<String>,
}

/// Audit-trail access sits behind the bearer token plus a secondary
/// password carried in the body.
pub async fn recent(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<LogsBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.password != state.config.log_access_password {
        return Err(ApiError::Forbidden("wrong log access password".to_string()));
    }

    let filter = body
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    let logs = state
        .db
        .call(move |conn| store::recent_logs(conn, LOG_LIMIT, filter.as_deref()))
        .await?;
    Ok(Json(json!({ "logs": logs })))
}
