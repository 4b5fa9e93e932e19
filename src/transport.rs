//! HTTP transport bound to a single base URL.
//!
//! [`HttpTransport`] is the only place that talks to reqwest. It attaches
//! the standard headers, enforces the request deadline, and turns error
//! responses into [`ClientError::Http`] with a derived user message. A 401
//! clears the session token and notifies the [`SessionContext`].
//!
//! The [`Transport`] trait is the seam the dispatcher and searchers depend
//! on, so tests can substitute scripted transports.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::candidates::TransportCandidate;
use crate::error::{AttemptLog, ClientError, ClientResult};
use crate::error_body;
use crate::session::SessionContext;
use crate::timeout::with_timeout;

/// Header carrying a per-request id for tracing across services.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the request may be re-sent to another candidate. Only POST
    /// creates; PATCH bodies set fields and repeat safely.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Method::Post)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(ClientError::InvalidRequest(format!(
                "unsupported method: {}",
                other
            ))),
        }
    }
}

/// A logical request, independent of which base URL serves it.
///
/// `path` is relative to the candidate base URL and may include a query
/// string.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `"GET /api/notes"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body. Empty bodies become `null`; non-JSON bodies become a
    /// JSON string.
    pub body: Value,
    /// Response headers, names lowercased.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Label of the candidate that answered.
    pub served_by: String,
    /// Candidates that failed before `served_by` answered.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptLog>,
}

impl Response {
    pub fn new(status: u16, body: Value, served_by: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
            served_by: served_by.into(),
            attempts: Vec::new(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Anything that can execute a [`RequestSpec`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short description for logs and attempt trails.
    fn label(&self) -> String;

    async fn send(&self, spec: &RequestSpec) -> ClientResult<Response>;

    async fn get(&self, path: &str) -> ClientResult<Response> {
        self.send(&RequestSpec::get(path)).await
    }

    async fn post(&self, path: &str, body: Value) -> ClientResult<Response> {
        self.send(&RequestSpec::post(path, body)).await
    }

    async fn put(&self, path: &str, body: Value) -> ClientResult<Response> {
        self.send(&RequestSpec::put(path, body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> ClientResult<Response> {
        self.send(&RequestSpec::patch(path, body)).await
    }

    async fn delete(&self, path: &str) -> ClientResult<Response> {
        self.send(&RequestSpec::delete(path)).await
    }
}

// ============ reqwest transport ============

pub struct HttpTransport {
    candidate: TransportCandidate,
    client: reqwest::Client,
    session: Arc<dyn SessionContext>,
    default_timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        candidate: TransportCandidate,
        session: Arc<dyn SessionContext>,
        default_timeout: Duration,
    ) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("assistant-link/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            candidate,
            client,
            session,
            default_timeout,
        })
    }

    pub fn candidate(&self) -> &TransportCandidate {
        &self.candidate
    }

    fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return format!("{}/", self.candidate.base_url);
        }
        if path.starts_with('/') {
            format!("{}{}", self.candidate.base_url, path)
        } else {
            format!("{}/{}", self.candidate.base_url, path)
        }
    }

    fn build_headers(&self, spec: &RequestSpec) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let request_id = uuid::Uuid::new_v4().to_string();
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(&request_id)
                .map_err(|e| ClientError::InvalidRequest(e.to_string()))?,
        );

        // Read at request time so logins/logouts between calls take effect.
        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::InvalidRequest("token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidRequest(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::InvalidRequest(format!("header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    async fn execute(&self, spec: &RequestSpec, url: &str) -> ClientResult<Response> {
        let mut req = self
            .client
            .request(spec.method.to_reqwest(), url)
            .headers(self.build_headers(spec)?);
        if let Some(body) = &spec.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let headers = collect_headers(resp.headers());
        let text = resp.text().await?;
        let body = parse_body(&text);

        if status.is_success() {
            let mut response = Response::new(status.as_u16(), body, self.candidate.label());
            response.headers = headers;
            return Ok(response);
        }

        Err(self.error_response(status, body))
    }

    fn error_response(&self, status: StatusCode, body: Value) -> ClientError {
        let user_message = error_body::user_message(status, &body);

        match status {
            StatusCode::BAD_REQUEST => {
                tracing::warn!(candidate = %self.candidate, "validation error: {}", user_message);
            }
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(candidate = %self.candidate, "session expired, clearing token");
                self.session.clear_token();
                self.session.on_unauthorized();
            }
            _ => {
                tracing::debug!(candidate = %self.candidate, status = status.as_u16(), "error response");
            }
        }

        ClientError::Http {
            status: status.as_u16(),
            user_message,
            body,
        }
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    fn label(&self) -> String {
        self.candidate.label()
    }

    async fn send(&self, spec: &RequestSpec) -> ClientResult<Response> {
        let url = self.url_for(&spec.path);
        let label = format!("{} {}", spec.method, url);
        let deadline = spec.timeout.unwrap_or(self.default_timeout);
        tracing::debug!(request = %label, "sending");
        with_timeout(self.execute(spec, &url), deadline, &label).await
    }
}
