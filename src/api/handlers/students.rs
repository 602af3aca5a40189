use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::recognizer::spawn_encoding_job;
use crate::store;

pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let students = state.db.call(|conn| store::list_students(conn)).await?;
    Ok(Json(json!({ "students": students })))
}

pub async fn get(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<store::Student>, ApiError> {
    let student = state
        .db
        .call(move |conn| store::get_student(conn, &student_id))
        .await?;
    Ok(Json(student))
}

pub async fn summary(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<store::StudentSummary>, ApiError> {
    let summary = state
        .db
        .call(move |conn| store::student_summary(conn, &student_id))
        .await?;
    Ok(Json(summary))
}

/// Create accepts multipart so the dashboard can attach a photo. A photo
/// triggers the asynchronous external encoding job; the student row is
/// usable immediately, with an empty biometric profile until the job lands.
pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<store::Student>), ApiError> {
    let mut student_id = None;
    let mut name = None;
    let mut email = None;
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "student_id" | "studentId" => student_id = Some(read_text(field).await?),
            "name" => name = Some(read_text(field).await?),
            "email" => email = Some(read_text(field).await?),
            "photo" => {
                let ext = photo_extension(field.file_name());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read photo: {e}")))?;
                if !bytes.is_empty() {
                    photo = Some((ext, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    let student_id = require(student_id, "student_id")?;
    let name = require(name, "name")?;
    let email = require(email, "email")?;

    // Write the photo first so the insert can reference its path; a failed
    // insert cleans the file back up.
    let mut photo_path: Option<PathBuf> = None;
    if let Some((ext, bytes)) = photo {
        let dir = state.config.photos_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        let path = dir.join(format!("{student_id}.{ext}"));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        photo_path = Some(path);
    }

    let photo_str = photo_path
        .as_ref()
        .map(|p| p.to_string_lossy().to_string());
    let insert = {
        let (student_id, name, email, photo_str) =
            (student_id.clone(), name.clone(), email.clone(), photo_str);
        state
            .db
            .call(move |conn| {
                let student = store::create_student(
                    conn,
                    &student_id,
                    &name,
                    &email,
                    photo_str.as_deref(),
                    Local::now().naive_local(),
                )?;
                store::append_log(
                    conn,
                    &format!("student created: {name} ({student_id})"),
                    Local::now().naive_local(),
                )?;
                Ok(student)
            })
            .await
    };

    let student = match insert {
        Ok(student) => student,
        Err(e) => {
            if let Some(path) = &photo_path {
                if let Err(io) = tokio::fs::remove_file(path).await {
                    warn!(path = %path.display(), error = %io, "failed to remove orphaned photo");
                }
            }
            return Err(e.into());
        }
    };

    if let Some(path) = photo_path {
        start_encoding_job(&state, &student.student_id, &student.name, &student.email, path);
    }

    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let photo_path = {
        let student_id = student_id.clone();
        state
            .db
            .call(move |conn| {
                let photo = store::delete_student(conn, &student_id)?;
                store::append_log(
                    conn,
                    &format!("student deleted: {student_id}"),
                    Local::now().naive_local(),
                )?;
                Ok(photo)
            })
            .await?
    };

    if let Some(path) = photo_path {
        if let Err(io) = tokio::fs::remove_file(&path).await {
            warn!(path, error = %io, "failed to remove student photo");
        }
    }

    Ok(Json(json!({ "ok": true })))
}

fn start_encoding_job(
    state: &AppState,
    student_id: &str,
    name: &str,
    email: &str,
    photo_path: PathBuf,
) {
    let child = spawn_encoding_job(
        &state.config.python_bin,
        &state.config.register_script,
        student_id,
        name,
        email,
        &photo_path,
    );
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            error!(student_id, error = %e, "failed to spawn face encoding job");
            return;
        }
    };

    let db = state.db.clone();
    let student_id = student_id.to_string();
    tokio::spawn(async move {
        let message = match child.wait_with_output().await {
            Ok(output) if output.status.success() => {
                info!(student_id, "face encoding job completed");
                format!("face encoding completed for student {student_id}")
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(student_id, status = %output.status, stderr = %stderr.trim(),
                    "face encoding job failed");
                format!("face encoding failed for student {student_id}")
            }
            Err(e) => {
                error!(student_id, error = %e, "face encoding job did not run");
                format!("face encoding failed for student {student_id}")
            }
        };
        let result = db
            .call(move |conn| store::append_log(conn, &message, Local::now().naive_local()))
            .await;
        if let Err(e) = result {
            error!(error = %e, "failed to record encoding job outcome");
        }
    });
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

fn photo_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}
