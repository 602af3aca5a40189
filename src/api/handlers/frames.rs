use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Local;
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::recognizer::process_transient_frame;
use crate::store::{self, Status};

/// Terminal-facing intake: persist the frame, delegate recognition to the
/// external process, mark every recognized student present, notify the
/// hub. The transient frame file is removed on every path, including
/// delegate timeout and failure.
pub async fn process_frame(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut frame: Option<Vec<u8>> = None;
    let mut class_id: Option<String> = None;
    let mut terminal_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "frame" | "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read frame: {e}")))?;
                frame = Some(bytes.to_vec());
            }
            "class_id" | "classId" => {
                class_id = Some(read_text(field).await?);
            }
            "terminal_id" | "terminalId" => {
                terminal_id = Some(read_text(field).await?);
            }
            _ => {}
        }
    }

    let frame = frame
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::Validation("missing frame".to_string()))?;
    let class_id = require(class_id, "class_id")?;
    let terminal_id = require(terminal_id, "terminal_id")?;

    // The class must exist; whether it is currently in session is the
    // terminal's concern (it picked the class via the scheduler).
    {
        let class_id = class_id.clone();
        state
            .db
            .call(move |conn| store::get_class(conn, &class_id))
            .await?;
    }

    let analysis = process_transient_frame(
        state.recognizer.as_ref(),
        &state.config.frames_dir(),
        &terminal_id,
        &class_id,
        &frame,
    )
    .await
    .map_err(ApiError::Delegate)?;

    info!(
        terminal_id,
        class_id,
        faces = analysis.total_faces,
        "camera frame processed"
    );
    {
        let (class_id, terminal_id) = (class_id.clone(), terminal_id.clone());
        let total = analysis.total_faces;
        state
            .db
            .call(move |conn| {
                store::append_log(
                    conn,
                    &format!(
                        "camera frame from terminal {terminal_id}: {total} face(s) detected in class {class_id}"
                    ),
                    Local::now().naive_local(),
                )
            })
            .await?;
    }

    let mut marked = Vec::new();
    for face in analysis.faces.iter().filter(|f| f.recognized) {
        let Some(student_id) = face.student_id.clone() else {
            continue;
        };
        let outcome = {
            let (student_id, class_id, terminal_id) =
                (student_id.clone(), class_id.clone(), terminal_id.clone());
            state
                .db
                .call(move |conn| {
                    store::mark_attendance(
                        conn,
                        &student_id,
                        &class_id,
                        Status::Present,
                        Some(&terminal_id),
                        Local::now().naive_local(),
                    )
                })
                .await
        };
        match outcome {
            Ok(outcome) => {
                state.hub.broadcast(&json!({
                    "type": "attendance_marked",
                    "studentId": outcome.record.student_id,
                    "studentName": face.name,
                    "classId": outcome.record.class_id,
                    "status": outcome.record.status,
                    "markedAt": outcome.record.marked_at,
                    "terminalId": terminal_id,
                    "source": "camera",
                }));
                marked.push(json!({
                    "studentId": outcome.record.student_id,
                    "studentName": face.name,
                }));
            }
            Err(store::StoreError::NotFound(_)) => {
                // Recognizer knows a face the roster no longer has; skip it.
                warn!(student_id, "recognized student no longer exists");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Json(json!({
        "faces": analysis.faces,
        "totalFaces": analysis.total_faces,
        "attendanceMarked": marked,
    })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| ApiError::Validation(format!("malformed multipart field: {e}")))
}

fn require(value: Option<String>, key: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("missing {key}"))),
    }
}
