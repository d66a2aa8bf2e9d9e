//! Liveness probes.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /` and `GET /api/test` — always 200 with `{"status": "ok"}`.
///
/// No dependencies, never blocks; safe as a container liveness probe.
pub async fn ok_status() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
