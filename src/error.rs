//! Error taxonomy for the relay and its translation to HTTP responses.
//!
//! Every failure in the chat path is funnelled into [`RelayError`] and
//! converted to a JSON error body at the handler boundary. Classification is
//! deliberately coarse: clients see a small set of stable messages, and raw
//! upstream error bodies never cross the boundary in production mode.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RunMode;

/// All the ways a chat request can fail.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The upstream credential was never configured; no call was attempted.
    #[error("OpenAI API key is not configured")]
    Configuration,

    /// Malformed or empty client input. The message is client-facing.
    #[error("{0}")]
    Validation(String),

    /// The completion provider failed. `status` is the provider's HTTP status
    /// when one was received; `None` for network-level failures.
    #[error("upstream completion failure: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Unexpected failure during dispatch. Logged server-side, never detailed
    /// to the client outside development mode.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    /// HTTP status for this error. Client mistakes are 400; everything the
    /// client cannot fix is 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The stable, client-safe message for this error.
    ///
    /// First match wins: a provider-supplied 401 or 429 is reported with a
    /// fixed message; any other upstream failure falls back to the provider's
    /// extracted message, or a generic one when there is none.
    pub fn client_message(&self) -> String {
        match self {
            Self::Configuration => "OpenAI API key is not configured".into(),
            Self::Validation(msg) => msg.clone(),
            Self::Upstream { status: Some(401), .. } => {
                "Invalid API key configuration. Please check the server API key.".into()
            }
            Self::Upstream { status: Some(429), .. } => {
                "Rate limit exceeded. Please try again later.".into()
            }
            Self::Upstream { message, .. } => {
                if message.trim().is_empty() {
                    "Unknown error occurred".into()
                } else {
                    message.clone()
                }
            }
            Self::Internal(_) => "Internal Server Error".into(),
        }
    }

    /// Extra debugging context, attached to responses only in development.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Configuration | Self::Validation(_) => None,
            Self::Upstream { status, message } => Some(json!({
                "upstream_status": status,
                "upstream_message": message,
            })),
            Self::Internal(err) => Some(json!({ "cause": format!("{err:?}") })),
        }
    }

    /// Build the client-facing error response.
    ///
    /// `details` is populated only when `mode` is development — production
    /// responses carry the `error` string and nothing else.
    pub fn into_response(self, mode: RunMode) -> Response {
        tracing::warn!(error = %self, status = %self.status_code(), "chat request failed");

        let mut body = json!({ "error": self.client_message() });
        if mode.is_development() {
            if let Some(details) = self.details() {
                body["details"] = details;
            }
        }
        (self.status_code(), Json(body)).into_response()
    }
}

/// Wraps [`anyhow::Error`] for handlers outside the chat path (contact,
/// submissions), where a plain 500 with the error text is sufficient.
///
/// This is the idiomatic axum pattern — see
/// <https://docs.rs/axum/latest/axum/error_handling/index.html>.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "handler error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
