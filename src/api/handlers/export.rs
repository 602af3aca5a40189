use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Local;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::store;
use crate::xlsx::{self, XLSX_CONTENT_TYPE};

use super::reports::{resolve_range, ReportQuery};

pub const EXPORT_HEADERS: [&str; 8] = [
    "Date",
    "Class",
    "Start",
    "End",
    "Student ID",
    "Student",
    "Status",
    "Marked At",
];

pub async fn attendance_export(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(query.start_date.as_deref(), query.end_date.as_deref(), today)?;

    let rows = state
        .db
        .call(move |conn| store::report(conn, start, end, None))
        .await?;

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.date.to_string(),
                r.class_name.clone(),
                r.start_time.to_string(),
                r.end_time.to_string(),
                r.student_id.clone(),
                r.student_name.clone(),
                r.status.as_str().to_string(),
                r.marked_at.clone(),
            ]
        })
        .collect();
    let workbook = xlsx::write_workbook("Attendance", &EXPORT_HEADERS, &cells)?;

    let filename = format!("attendance_{start}_{end}.xlsx");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        workbook,
    )
        .into_response())
}
