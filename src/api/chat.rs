//! `POST /api/chat` — the chat relay endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::AppState;
use crate::relay;

/// Relay a conversation to the completion provider.
///
/// The body is accepted as loose JSON so that shape problems surface as the
/// relay's own validation errors (400 with a specific message) rather than
/// extractor rejections. All failures are classified into the stable error
/// body by [`crate::error::RelayError`].
pub async fn chat(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    match relay::handle_chat(&state.config, state.provider.as_ref(), &body).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => err.into_response(state.config.run_mode),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt; // oneshot

    use crate::api::test_support::{router_with, router_with_stub};
    use crate::config::test_support::{config_with_key, config_without_key};
    use crate::config::RunMode;
    use crate::relay::test_support::StubProvider;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Success path
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn successful_relay_returns_the_reply() {
        let stub = Arc::new(StubProvider::replying("Hello"));
        let app = router_with_stub(Arc::clone(&stub));

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json, json!({ "reply": "Hello" }));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_reply_text_returns_the_fallback() {
        let stub = Arc::new(StubProvider::empty_handed());
        let app = router_with_stub(stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["reply"], "I'm not sure how to respond.");
    }

    // -----------------------------------------------------------------------
    // Validation failures (400, upstream never invoked)
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_messages_field_is_a_400() {
        let stub = Arc::new(StubProvider::replying("Hello"));
        let app = router_with_stub(Arc::clone(&stub));

        let resp = app.oneshot(chat_request(json!({}))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "messages array required");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_after_normalization_is_a_400() {
        let stub = Arc::new(StubProvider::replying("Hello"));
        let app = router_with_stub(Arc::clone(&stub));

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "no non-empty messages");
        assert_eq!(stub.call_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Configuration & upstream failures (500)
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_credential_is_a_500_and_never_reaches_upstream() {
        let stub = Arc::new(StubProvider::replying("Hello"));
        let app = router_with(config_without_key(), Arc::clone(&stub));

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "OpenAI API key is not configured");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn upstream_401_is_classified_as_invalid_api_key() {
        let stub = Arc::new(StubProvider::failing(Some(401), "Incorrect API key"));
        let app = router_with_stub(stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp.into_body()).await;
        assert!(
            json["error"].as_str().unwrap().contains("Invalid API key"),
            "got: {json}"
        );
    }

    #[tokio::test]
    async fn upstream_429_is_classified_as_rate_limited() {
        let stub = Arc::new(StubProvider::failing(Some(429), "quota"));
        let app = router_with_stub(stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp.into_body()).await;
        assert!(
            json["error"].as_str().unwrap().contains("Rate limit exceeded"),
            "got: {json}"
        );
    }

    #[tokio::test]
    async fn generic_upstream_failure_surfaces_provider_message() {
        let stub = Arc::new(StubProvider::failing(Some(503), "server overloaded"));
        let app = router_with_stub(stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "server overloaded");
    }

    #[tokio::test]
    async fn messageless_upstream_failure_surfaces_unknown_error() {
        let stub = Arc::new(StubProvider::failing(None, ""));
        let app = router_with_stub(stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "Unknown error occurred");
    }

    // -----------------------------------------------------------------------
    // Detail leakage boundary
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn production_mode_never_attaches_details() {
        let mut config = config_with_key();
        config.run_mode = RunMode::Production;
        let stub = Arc::new(StubProvider::failing(Some(503), "billing account suspended"));
        let app = router_with(config, stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        let json = body_json(resp.into_body()).await;
        assert!(json.get("details").is_none(), "details leaked: {json}");
    }

    #[tokio::test]
    async fn development_mode_attaches_upstream_details() {
        let mut config = config_with_key();
        config.run_mode = RunMode::Development;
        let stub = Arc::new(StubProvider::failing(Some(503), "billing account suspended"));
        let app = router_with(config, stub);

        let resp = app
            .oneshot(chat_request(
                json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
            ))
            .await
            .unwrap();

        let json = body_json(resp.into_body()).await;
        assert_eq!(json["details"]["upstream_status"], 503);
    }

    // -----------------------------------------------------------------------
    // Probes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn liveness_probes_return_ok_status() {
        for uri in ["/", "/api/test"] {
            let app = router_with_stub(Arc::new(StubProvider::replying("x")));
            let req = Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let resp = app.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let json = body_json(resp.into_body()).await;
            assert_eq!(json["status"], "ok", "{uri}");
        }
    }
}
