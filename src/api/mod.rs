//! HTTP surface — routes, shared state, and middleware layers.
//!
//! Handlers are intentionally thin: HTTP concerns live here, all chat logic
//! lives in [`crate::relay`]. The front end is served separately, so CORS is
//! wide open like the original Express setup.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::upstream::CompletionProvider;

pub mod chat;
pub mod contact;
pub mod health;

/// Shared per-process state. Built once in `main` and cloned (via `Arc`) into
/// every handler — handlers never read configuration from the environment.
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::ok_status))
        .route("/api/test", get(health::ok_status))
        .route("/api/chat", post(chat::chat))
        .route("/api/contact", post(contact::submit))
        .route("/api/submissions", get(contact::list))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::test_support::config_with_key;
    use crate::relay::test_support::StubProvider;

    /// Router backed by the given stub provider and a key-bearing config.
    pub fn router_with_stub(stub: Arc<StubProvider>) -> Router {
        router_with(config_with_key(), stub)
    }

    pub fn router_with(config: Config, stub: Arc<StubProvider>) -> Router {
        router(Arc::new(AppState {
            config: Arc::new(config),
            provider: stub,
        }))
    }
}
