use axum::extract::State;
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::mailer::{attendance_notice_html, attendance_notice_subject};
use crate::store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    #[serde(default)]
    class_id: String,
}

pub async fn status(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    Json(state.mailer.status())
}

/// One personalized notice per rostered student with a usable address.
/// Individual send failures are counted, not fatal.
pub async fn send_attendance_email(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<SendEmailBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.class_id.trim().is_empty() {
        return Err(ApiError::Validation("classId is required".to_string()));
    }
    if !state.mailer.is_configured() {
        return Err(ApiError::Disabled("email is not configured"));
    }

    let (class, roster) = {
        let class_id = body.class_id.clone();
        state
            .db
            .call(move |conn| {
                let class = store::get_class(conn, &class_id)?;
                let roster = store::class_attendance(conn, &class_id)?;
                Ok((class, roster))
            })
            .await?
    };

    let date = class.date.to_string();
    let subject = attendance_notice_subject(&class.name, &date);
    let mut sent = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for entry in &roster {
        if entry.email.trim().is_empty() {
            skipped += 1;
            continue;
        }
        let html =
            attendance_notice_html(&entry.student_name, &class.name, &date, entry.status);
        match state.mailer.send_html(&entry.email, &subject, html).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(student = %entry.student_id, error = %e, "attendance email failed");
                failed += 1;
            }
        }
    }

    let message = format!(
        "attendance emails for {}: {} sent, {} failed, {} skipped",
        class.name, sent, failed, skipped
    );
    state
        .db
        .call(move |conn| store::append_log(conn, &message, Local::now().naive_local()))
        .await?;

    Ok(Json(json!({
        "sent": sent,
        "failed": failed,
        "skipped": skipped,
    })))
}
