use axum::extract::State;
use axum::Json;
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::{issue_token, TOKEN_TTL_SECS};
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store;

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }
    if body.username != state.config.admin_username || body.password != state.config.admin_password
    {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = issue_token(
        &state.config.token_secret,
        &body.username,
        Utc::now().timestamp(),
        TOKEN_TTL_SECS,
    );

    let username = body.username;
    state
        .db
        .call(move |conn| {
            store::append_log(
                conn,
                &format!("admin login: {username}"),
                Local::now().naive_local(),
            )
        })
        .await?;

    Ok(Json(json!({
        "token": token,
        "tokenType": "Bearer",
        "expiresIn": TOKEN_TTL_SECS,
    })))
}
