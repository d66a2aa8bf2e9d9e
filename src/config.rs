//! Configuration for chat-relay.
//!
//! Config is read once from the environment at startup and passed by
//! reference into the request handlers — nothing in the request path reads
//! ambient environment variables. A missing API key is tolerated at startup
//! (logged as a warning) and surfaced per-request as a configuration error,
//! so the contact endpoints keep working without a key.

use anyhow::Context;

/// Distinguishes development from production behaviour.
///
/// The only observable difference is error verbosity: in [`RunMode::Development`]
/// error responses may carry a `details` field with upstream/internal context;
/// in [`RunMode::Production`] that field is never attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    Development,
    /// Fail-safe default: anything other than an explicit `"development"`
    /// (including an unset variable) runs as production.
    #[default]
    Production,
}

impl RunMode {
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream API key (`OPENAI_API_KEY`). `None` means chat requests fail
    /// with a configuration error; no upstream call is ever attempted.
    pub api_key: Option<String>,

    /// Error-verbosity mode (`RELAY_ENV`).
    pub run_mode: RunMode,

    /// Listen port (`PORT`, default 3001).
    pub port: u16,

    /// Model identifier sent upstream (`RELAY_MODEL`, default `gpt-3.5-turbo`).
    pub model: String,

    /// Upstream base URL without a trailing `/v1` (`OPENAI_BASE_URL`,
    /// default `https://api.openai.com`). Overridable so tests can point the
    /// relay at a mock server.
    pub base_url: String,

    /// Where contact-form submissions are appended
    /// (`RELAY_SUBMISSIONS_PATH`, default `submissions.json`).
    pub submissions_path: std::path::PathBuf,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if `PORT` is set but not a valid port number.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got `{v}`"))?,
            Err(_) => defaults::port(),
        };

        Ok(Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            run_mode: RunMode::from_env_value(std::env::var("RELAY_ENV").ok().as_deref()),
            port,
            model: std::env::var("RELAY_MODEL").unwrap_or_else(|_| defaults::model()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| defaults::base_url()),
            submissions_path: std::env::var("RELAY_SUBMISSIONS_PATH")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| defaults::submissions_path()),
        })
    }
}

mod defaults {
    pub fn port() -> u16 { 3001 }
    pub fn model() -> String { "gpt-3.5-turbo".into() }
    pub fn base_url() -> String { "https://api.openai.com".into() }
    pub fn submissions_path() -> std::path::PathBuf { "submissions.json".into() }
}
