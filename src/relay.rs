//! The relay dispatcher — the core of the chat path.
//!
//! [`handle_chat`] checks preconditions in a fixed order (credential, message
//! list present, message list non-empty after normalization), then issues a
//! single completion request through the injected provider. The first failing
//! check wins and no upstream call is made. There are no retries: one
//! upstream failure is terminal for the request.

use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::RelayError;
use crate::messages::{normalize, IncomingMessage};
use crate::upstream::{CompletionProvider, GenerationParams};

/// Returned when the provider answers without any reply text.
const FALLBACK_REPLY: &str = "I'm not sure how to respond.";

/// Bounds on what gets forwarded upstream. The original service forwarded
/// conversations unbounded; these caps close that resource-exhaustion gap.
/// Violations are rejected outright rather than silently truncated, so the
/// client knows its conversation was not what the model saw.
const MAX_MESSAGES: usize = 64;
const MAX_CONTENT_BYTES: usize = 8 * 1024;

/// Successful chat response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

/// Relay a raw chat request body to the completion provider.
///
/// The body is taken as loose JSON rather than a typed extractor so that a
/// missing or mis-typed `messages` field produces the relay's own validation
/// message instead of a framework rejection.
pub async fn handle_chat(
    config: &Config,
    provider: &dyn CompletionProvider,
    body: &Value,
) -> Result<ChatReply, RelayError> {
    if config.api_key.is_none() {
        return Err(RelayError::Configuration);
    }

    let raw = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| RelayError::Validation("messages array required".into()))?;

    // Non-object elements (numbers, strings, ...) are treated as empty and
    // filtered by normalization, mirroring the duck-typed behaviour clients
    // have come to rely on. Object elements never fail wholesale — wrongly
    // typed fields degrade individually inside IncomingMessage.
    let incoming: Vec<IncomingMessage> = raw
        .iter()
        .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
        .collect();

    let conversation = normalize(&incoming);
    if conversation.is_empty() {
        return Err(RelayError::Validation("no non-empty messages".into()));
    }
    if conversation.len() > MAX_MESSAGES {
        return Err(RelayError::Validation(format!(
            "too many messages (max {MAX_MESSAGES})"
        )));
    }
    if let Some(oversized) = conversation
        .iter()
        .position(|m| m.content.len() > MAX_CONTENT_BYTES)
    {
        return Err(RelayError::Validation(format!(
            "message {oversized} exceeds {MAX_CONTENT_BYTES} bytes"
        )));
    }

    let params = GenerationParams::for_model(&config.model);
    tracing::debug!(
        messages = conversation.len(),
        model = %params.model,
        "dispatching completion request"
    );

    let reply = provider
        .complete(&conversation, &params)
        .await?
        .unwrap_or_else(|| FALLBACK_REPLY.to_string());

    Ok(ChatReply { reply })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::messages::CanonicalMessage;

    /// What the stub should do when called.
    pub enum StubBehaviour {
        Reply(Option<String>),
        Fail { status: Option<u16>, message: String },
    }

    /// A [`CompletionProvider`] double that records every call, so tests can
    /// assert the dispatcher never reached upstream on precondition failures.
    pub struct StubProvider {
        pub behaviour: StubBehaviour,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<Vec<CanonicalMessage>>>,
    }

    impl StubProvider {
        pub fn replying(text: &str) -> Self {
            Self::with(StubBehaviour::Reply(Some(text.to_string())))
        }

        pub fn empty_handed() -> Self {
            Self::with(StubBehaviour::Reply(None))
        }

        pub fn failing(status: Option<u16>, message: &str) -> Self {
            Self::with(StubBehaviour::Fail { status, message: message.to_string() })
        }

        pub fn with(behaviour: StubBehaviour) -> Self {
            Self {
                behaviour,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(
            &self,
            messages: &[CanonicalMessage],
            _params: &GenerationParams,
        ) -> Result<Option<String>, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages.to_vec());
            match &self.behaviour {
                StubBehaviour::Reply(text) => Ok(text.clone()),
                StubBehaviour::Fail { status, message } => Err(RelayError::Upstream {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }
    }
}
