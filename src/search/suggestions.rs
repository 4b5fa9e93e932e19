//! Search-box suggestions with a static fallback.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::mapping::encode;
use super::snippet::contains_case_insensitive;
use crate::timeout::with_timeout;
use crate::transport::Transport;

pub const MAX_SUGGESTIONS: usize = 5;

/// Offline keywords, matched against the query when the backend is unreachable.
pub const STATIC_KEYWORDS: &[&str] = &[
    "chats",
    "notes",
    "tasks",
    "documents",
    "reminders",
    "calendar events",
    "emails",
    "dictionary",
];

pub struct SuggestionSource {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl SuggestionSource {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Up to [`MAX_SUGGESTIONS`] suggestions. Never fails and never returns
    /// an empty list.
    pub async fn get_search_suggestions(&self, query: &str) -> Vec<String> {
        let path = format!("/api/search/suggestions?q={}", encode(query.trim()));
        match with_timeout(self.transport.get(&path), self.timeout, "search suggestions").await {
            Ok(resp) => {
                let remote = parse_suggestions(&resp.body);
                if !remote.is_empty() {
                    return remote;
                }
                tracing::debug!("backend returned no suggestions, using static list");
            }
            Err(e) => tracing::debug!("suggestions unavailable, using static list: {}", e),
        }
        static_suggestions(query)
    }
}

fn parse_suggestions(body: &Value) -> Vec<String> {
    let list: &[Value] = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("suggestions").or_else(|| obj.get("results")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    list.iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(o) => ["text", "title", "query"]
                .iter()
                .find_map(|k| o.get(*k).and_then(Value::as_str))
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Static keywords containing `query`; the first few keywords if none do.
pub fn static_suggestions(query: &str) -> Vec<String> {
    let query = query.trim();
    let matches: Vec<String> = STATIC_KEYWORDS
        .iter()
        .filter(|k| !query.is_empty() && contains_case_insensitive(k, query))
        .take(MAX_SUGGESTIONS)
        .map(|k| k.to_string())
        .collect();

    if !matches.is_empty() {
        return matches;
    }
    STATIC_KEYWORDS
        .iter()
        .take(MAX_SUGGESTIONS)
        .map(|k| k.to_string())
        .collect()
}
