//! Error taxonomy for the client layer.
//!
//! Every fallible operation in the library returns [`ClientError`]. The
//! variants map onto the failure classes callers need to tell apart:
//!
//! | Variant | Code | Meaning |
//! |---------|------|---------|
//! | [`Timeout`](ClientError::Timeout) | `TIMEOUT` | The deadline elapsed before the operation settled |
//! | [`Network`](ClientError::Network) | `NETWORK_ERROR` | No HTTP response (DNS, refused, reset) |
//! | [`Http`](ClientError::Http) | `HTTP_ERROR` | The server answered with a non-2xx status |
//! | [`BackendUnavailable`](ClientError::BackendUnavailable) | `BACKEND_UNAVAILABLE` | Every candidate failed |
//! | [`InvalidRequest`](ClientError::InvalidRequest) | `INVALID_REQUEST` | The request could not be built |
//! | [`Decode`](ClientError::Decode) | `DECODE_ERROR` | A response body had an unexpected shape |

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One failed candidate inside a single cascade run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLog {
    pub candidate_label: String,
    pub error_message: String,
    /// Status of the failed attempt when the candidate did answer, e.g. a 503
    /// from a gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl AttemptLog {
    pub fn new(candidate_label: impl Into<String>, err: &ClientError) -> Self {
        Self {
            candidate_label: candidate_label.into(),
            error_message: err.to_string(),
            http_status: err.http_status(),
        }
    }
}

impl fmt::Display for AttemptLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate_label, self.error_message)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{label} timed out after {}ms", .after.as_millis())]
    Timeout { label: String, after: Duration },

    #[error("network error: {message}")]
    Network { message: String, connect: bool },

    #[error("HTTP {status}: {user_message}")]
    Http {
        status: u16,
        user_message: String,
        body: serde_json::Value,
    },

    #[error("backend unavailable, all {} candidates failed: {}", .attempts.len(), format_attempts(.attempts))]
    BackendUnavailable { attempts: Vec<AttemptLog> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

fn format_attempts(attempts: &[AttemptLog]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Timeout { .. } => "TIMEOUT",
            ClientError::Network { .. } => "NETWORK_ERROR",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            ClientError::InvalidRequest(_) => "INVALID_REQUEST",
            ClientError::Decode(_) => "DECODE_ERROR",
        }
    }

    /// Whether the fallback cascade should absorb this error and move on to
    /// the next candidate.
    ///
    /// Gateway statuses (502/503/504) mean the route in front of the backend
    /// is broken, so they count as candidate failures. Every other HTTP
    /// status is a real answer from the backend and is surfaced.
    pub fn is_candidate_failure(&self) -> bool {
        match self {
            ClientError::Timeout { .. } | ClientError::Network { .. } => true,
            ClientError::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// True when the request never reached a server, so re-sending it
    /// elsewhere cannot duplicate a write.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, ClientError::Network { connect: true, .. })
    }

    /// HTTP status if the server answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// First HTTP status any server produced, including gateway statuses
    /// swallowed by an exhausted cascade. `None` when nothing answered.
    pub fn answered_status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::BackendUnavailable { attempts } => {
                attempts.iter().find_map(|a| a.http_status)
            }
            _ => None,
        }
    }

    /// Message suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http { user_message, .. } => user_message.clone(),
            other => other.to_string(),
        }
    }

    /// Attempt trail of an exhausted cascade; empty for other variants.
    pub fn attempts(&self) -> &[AttemptLog] {
        match self {
            ClientError::BackendUnavailable { attempts } => attempts,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            return ClientError::InvalidRequest(e.to_string());
        }
        if e.is_decode() {
            return ClientError::Decode(e.to_string());
        }
        ClientError::Network {
            message: e.to_string(),
            connect: e.is_connect(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
