use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store;
use crate::timetable;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
}

pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let classes = state.db.call(|conn| store::list_classes(conn)).await?;
    Ok(Json(json!({ "classes": classes })))
}

pub async fn get(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<store::Class>, ApiError> {
    let class = state
        .db
        .call(move |conn| store::get_class(conn, &class_id))
        .await?;
    Ok(Json(class))
}

pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CreateClassBody>,
) -> Result<(StatusCode, Json<store::Class>), ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("missing name".to_string()));
    }
    let date = parse_date(&body.date)?;
    let start_time = parse_time(&body.start_time, "startTime")?;
    let end_time = parse_time(&body.end_time, "endTime")?;
    if start_time >= end_time {
        return Err(ApiError::Validation(
            "startTime must be before endTime".to_string(),
        ));
    }

    let class = state
        .db
        .call(move |conn| {
            let class = store::create_class(
                conn,
                &name,
                date,
                start_time,
                end_time,
                Local::now().naive_local(),
            )?;
            store::append_log(
                conn,
                &format!("class created: {} on {}", class.name, class.date),
                Local::now().naive_local(),
            )?;
            Ok(class)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .call(move |conn| {
            store::delete_class(conn, &class_id)?;
            store::append_log(
                conn,
                &format!("class deleted: {class_id}"),
                Local::now().naive_local(),
            )?;
            Ok(())
        })
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// Bulk import: a CSV upload with one `name,date,start_time,end_time` row
/// per class. Good rows are inserted; bad lines come back as errors.
pub async fn upload_timetable(
    _admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut content: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.file_name().is_some() || matches!(field.name(), Some("file" | "timetable")) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("failed to read upload: {e}")))?;
            content = Some(String::from_utf8_lossy(&bytes).to_string());
            break;
        }
    }
    let Some(content) = content else {
        return Err(ApiError::Validation("missing timetable file".to_string()));
    };

    let parsed = timetable::parse_timetable(&content);
    if parsed.rows.is_empty() && parsed.errors.is_empty() {
        return Err(ApiError::Validation("timetable file is empty".to_string()));
    }

    let row_count = parsed.rows.len();
    let imported = state
        .db
        .call(move |conn| {
            let mut created = Vec::with_capacity(parsed.rows.len());
            for row in &parsed.rows {
                created.push(store::create_class(
                    conn,
                    &row.name,
                    row.date,
                    row.start_time,
                    row.end_time,
                    Local::now().naive_local(),
                )?);
            }
            store::append_log(
                conn,
                &format!("timetable import: {row_count} classes created"),
                Local::now().naive_local(),
            )?;
            Ok((created, parsed.errors))
        })
        .await?;
    let (created, errors) = imported;

    Ok(Json(json!({
        "imported": created.len(),
        "classes": created,
        "errors": errors,
    })))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("bad date {raw:?}, expected YYYY-MM-DD")))
}

fn parse_time(raw: &str, key: &str) -> Result<NaiveTime, ApiError> {
    let t = raw.trim();
    NaiveTime::parse_from_str(t, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
        .map_err(|_| ApiError::Validation(format!("bad {key} {raw:?}, expected HH:MM")))
}
