use axum::extract::{Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store::{self, REPORT_EPOCH};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
}

/// Resolves the requested range, defaulting to the fixed epoch through
/// today (server-local) so an unfiltered report is deterministic.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = match start {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
        _ => NaiveDate::parse_from_str(REPORT_EPOCH, "%Y-%m-%d").expect("epoch constant"),
    };
    let end = match end {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
        _ => today,
    };
    if start > end {
        return Err(ApiError::Validation(
            "startDate must not be after endDate".to_string(),
        ));
    }
    Ok((start, end))
}

pub async fn attendance_report(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(query.start_date.as_deref(), query.end_date.as_deref(), today)?;
    let student_id = query
        .student_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let rows = state
        .db
        .call(move |conn| store::report(conn, start, end, student_id.as_deref()))
        .await?;
    Ok(Json(json!({
        "startDate": start,
        "endDate": end,
        "rows": rows,
    })))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("bad date {raw:?}, expected YYYY-MM-DD")))
}
