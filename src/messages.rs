//! Conversation normalization.
//!
//! Clients send loosely-shaped message objects (the front end has gone
//! through several iterations of field names). This module converts them into
//! the canonical `{role, content}` pairs the completion provider expects:
//! roles are folded onto a closed set, content is resolved and trimmed, and
//! blank messages are dropped. Relative order is preserved — it defines the
//! dialogue turns the model sees.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A message as received from the client. Unknown fields are ignored.
///
/// Older front-end builds sent the text under `message` instead of `content`;
/// both are accepted, with `content` taking precedence. Field values of the
/// wrong JSON type degrade per field instead of failing the whole message:
/// a non-string `role` counts as missing, non-string text is stringified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, deserialize_with = "role_or_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub message: Option<String>,
}

/// Accepts any JSON value where a role should be; only strings survive.
/// A number or object in the role slot is the same as no role at all.
fn role_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|v| v.as_str().map(String::from)))
}

/// Accepts any JSON value in a text field: strings pass through, null counts
/// as absent, anything else is stringified the way loose clients expect.
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

/// The closed set of roles forwarded upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Case-insensitive mapping from the wire role. `"bot"` is an alias for
    /// assistant kept for older clients; anything unrecognized (or missing)
    /// defaults to user.
    fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("").to_ascii_lowercase().as_str() {
            "system" => Self::System,
            "assistant" | "bot" => Self::Assistant,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// A normalized message: a role from the closed set and non-empty trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalMessage {
    pub role: Role,
    pub content: String,
}

/// Normalize a client-supplied message list.
///
/// Each element resolves its text from `content`, falling back to `message`;
/// the result is trimmed and messages that end up empty are dropped rather
/// than failing the whole request. The output preserves input order. An empty
/// result is not an error at this layer — the dispatcher decides whether an
/// empty conversation is acceptable.
pub fn normalize(raw: &[IncomingMessage]) -> Vec<CanonicalMessage> {
    raw.iter()
        .filter_map(|msg| {
            let content = msg
                .content
                .as_deref()
                .or(msg.message.as_deref())
                .unwrap_or("")
                .trim();
            if content.is_empty() {
                return None;
            }
            Some(CanonicalMessage {
                role: Role::parse(msg.role.as_deref()),
                content: content.to_string(),
            })
        })
        .collect()
}
