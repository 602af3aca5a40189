//! Seam to the out-of-process face recognizer. The service never links the
//! recognition code: it hands a frame path to an external script, waits with
//! a hard timeout, and parses the script's stdout as JSON.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer timed out after {0:?}")]
    Timeout(Duration),
    #[error("recognizer failed: {0}")]
    Failed(String),
    #[error("recognizer produced unparsable output: {0}")]
    BadOutput(String),
    #[error("recognizer io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// One detected face. Field names follow the delegate's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMatch {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub recognized: bool,
    pub name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub faces: Vec<FaceMatch>,
    #[serde(default)]
    pub total_faces: usize,
}

#[derive(Debug, Deserialize)]
struct DelegateOutput {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    faces: Vec<FaceMatch>,
    #[serde(default)]
    total_faces: Option<usize>,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(
        &self,
        frame: &Path,
        class_id: &str,
        terminal_id: &str,
    ) -> Result<FrameAnalysis, RecognizerError>;
}

/// Spawns `<bin> <script> <frame> <class_id> <terminal_id>` and parses its
/// stdout. The child is spawned with `kill_on_drop`, so the timeout path
/// terminates it instead of leaving an orphan behind.
pub struct ExternalRecognizer {
    bin: String,
    script: PathBuf,
    timeout: Duration,
}

impl ExternalRecognizer {
    pub fn new(bin: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            script: script.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Recognizer for ExternalRecognizer {
    async fn recognize(
        &self,
        frame: &Path,
        class_id: &str,
        terminal_id: &str,
    ) -> Result<FrameAnalysis, RecognizerError> {
        let child = Command::new(&self.bin)
            .arg(&self.script)
            .arg(frame)
            .arg(class_id)
            .arg(terminal_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(RecognizerError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(RecognizerError::Failed(if detail.is_empty() {
                format!("exit status {}", output.status)
            } else {
                format!("exit status {}: {}", output.status, detail)
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: DelegateOutput = serde_json::from_str(stdout.trim())
            .map_err(|e| RecognizerError::BadOutput(format!("{e}: {}", truncated(&stdout))))?;

        if let Some(error) = parsed.error {
            return Err(RecognizerError::Failed(error));
        }

        let total = parsed.total_faces.unwrap_or(parsed.faces.len());
        Ok(FrameAnalysis {
            faces: parsed.faces,
            total_faces: total,
        })
    }
}

fn truncated(raw: &str) -> String {
    const MAX: usize = 200;
    let trimmed = raw.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let mut end = MAX;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}

/// Writes the frame to a transient file namespaced per terminal and per
/// request, runs the recognizer over it, and removes the file before
/// returning. Success, delegate failure, and timeout all clean up.
pub async fn process_transient_frame(
    recognizer: &dyn Recognizer,
    frames_dir: &Path,
    terminal_id: &str,
    class_id: &str,
    bytes: &[u8],
) -> Result<FrameAnalysis, RecognizerError> {
    tokio::fs::create_dir_all(frames_dir).await?;
    let path = frames_dir.join(format!(
        "{}-{}.jpg",
        sanitize_terminal_id(terminal_id),
        uuid::Uuid::new_v4()
    ));
    tokio::fs::write(&path, bytes).await?;

    let result = recognizer.recognize(&path, class_id, terminal_id).await;

    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove transient frame");
    }
    result
}

fn sanitize_terminal_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Fire-and-forget encoding job for a freshly uploaded student photo. The
/// script owns the `face_encoding` column through its own DB connection;
/// this side only records the outcome in the activity log via the caller.
pub fn spawn_encoding_job(
    bin: &str,
    script: &Path,
    student_id: &str,
    name: &str,
    email: &str,
    photo_path: &Path,
) -> Result<tokio::process::Child, std::io::Error> {
    Command::new(bin)
        .arg(script)
        .arg(student_id)
        .arg(name)
        .arg(email)
        .arg(photo_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}
