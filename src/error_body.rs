//! Derive a human-readable message from a server error body.
//!
//! Backends answer validation failures in several shapes. [`ServerErrorBody`]
//! names each one; [`ServerErrorBody::parse`] tries them in priority order
//! and [`user_message`] always produces a non-empty string.

use serde_json::Value;

/// Known error-body shapes, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorBody {
    /// `{ "errors": ["..", { "message": ".." }, { "msg": ".." }] }`
    ErrorList(Vec<String>),
    /// `{ "message": ".." }`
    Message(String),
    /// `{ "error": ".." }` or `{ "error": { "message": ".." } }`
    Error(String),
    /// The whole body is a JSON string.
    Text(String),
    /// Nothing usable.
    Unrecognized,
}

impl ServerErrorBody {
    pub fn parse(body: &Value) -> Self {
        if let Some(list) = body.get("errors").and_then(Value::as_array) {
            let messages: Vec<String> = list.iter().filter_map(list_entry_message).collect();
            if !messages.is_empty() {
                return ServerErrorBody::ErrorList(messages);
            }
        }

        if let Some(msg) = non_empty_str(body.get("message")) {
            return ServerErrorBody::Message(msg);
        }

        match body.get("error") {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return ServerErrorBody::Error(s.trim().to_string())
            }
            Some(Value::Object(obj)) => {
                if let Some(msg) = non_empty_str(obj.get("message")) {
                    return ServerErrorBody::Error(msg);
                }
            }
            _ => {}
        }

        if let Some(text) = non_empty_str(Some(body)) {
            return ServerErrorBody::Text(text);
        }

        ServerErrorBody::Unrecognized
    }

    /// Message for this body, or `None` for [`Unrecognized`](Self::Unrecognized).
    pub fn message(&self) -> Option<String> {
        match self {
            ServerErrorBody::ErrorList(items) => Some(items.join("; ")),
            ServerErrorBody::Message(m) | ServerErrorBody::Error(m) | ServerErrorBody::Text(m) => {
                Some(m.clone())
            }
            ServerErrorBody::Unrecognized => None,
        }
    }
}

fn list_entry_message(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => {
            non_empty_str(obj.get("message")).or_else(|| non_empty_str(obj.get("msg")))
        }
        _ => None,
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// User-facing message for an error response. Falls back to the status text.
pub fn user_message(status: reqwest::StatusCode, body: &Value) -> String {
    ServerErrorBody::parse(body).message().unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    })
}
