//! Contact-form endpoints.
//!
//! Submissions are validated for required fields and appended to a flat JSON
//! file — deliberately simple storage, matching what the site needs. The file
//! is read-modify-written per request; at contact-form traffic volumes that
//! is not a contention concern.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;

/// Inbound contact form. Every field is required; presence is validated by
/// the handler so the client gets the canonical error message rather than a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A stored submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

/// `POST /api/contact` — validate and persist a submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ContactForm>,
) -> Result<Response, AppError> {
    let required = |field: &Option<String>| {
        field
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let (name, email, subject, message) = match (
        required(&form.name),
        required(&form.email),
        required(&form.subject),
        required(&form.message),
    ) {
        (Some(n), Some(e), Some(s), Some(m)) => (n, e, s, m),
        _ => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "All fields are required" })),
            )
                .into_response());
        }
    };

    let submission = ContactSubmission {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        subject,
        message,
        timestamp: Utc::now(),
        status: "new".into(),
    };

    append_submission(&state.config.submissions_path, &submission)
        .context("Failed to save message")?;

    tracing::info!(id = %submission.id, from = %submission.email, "contact submission saved");
    Ok(Json(json!({ "success": true, "message": "Message sent successfully" })).into_response())
}

/// `GET /api/submissions` — list stored submissions (empty when none yet).
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContactSubmission>>, AppError> {
    let submissions =
        load_submissions(&state.config.submissions_path).context("Failed to read submissions")?;
    Ok(Json(submissions))
}

/// Read the submissions file; a missing file is an empty list.
fn load_submissions(path: &Path) -> anyhow::Result<Vec<ContactSubmission>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Append one submission via read-modify-write.
///
/// A corrupt existing file is logged and replaced rather than blocking new
/// submissions, matching the forgiving behaviour the site has always had.
fn append_submission(path: &Path, submission: &ContactSubmission) -> anyhow::Result<()> {
    let mut submissions = match load_submissions(path) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "submissions file unreadable — starting fresh");
            Vec::new()
        }
    };
    submissions.push(submission.clone());
    std::fs::write(path, serde_json::to_string_pretty(&submissions)?)?;
    Ok(())
}
