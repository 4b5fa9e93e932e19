//! Fallback cascade across transport candidates.
//!
//! [`Dispatcher::smart_request`] tries each candidate in configuration
//! order, one at a time, and returns the first success. Candidate failures
//! (no response, timeout, gateway status) are recorded and skipped; any
//! other HTTP error is the backend's answer and is returned as-is. When every
//! candidate fails the caller gets [`ClientError::BackendUnavailable`] with
//! the full attempt trail.
//!
//! Candidates are tried strictly sequentially. They are alternate routes to
//! the same backend, so racing them would only double real traffic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::candidates::{build_candidates, TransportCandidate};
use crate::config::Config;
use crate::error::{AttemptLog, ClientError, ClientResult};
use crate::session::SessionContext;
use crate::transport::{HttpTransport, RequestSpec, Response, Transport};

pub struct Dispatcher {
    transports: Vec<Arc<dyn Transport>>,
    /// Write requests may be re-sent after a failure that might have
    /// reached the server.
    mirrored: bool,
}

impl Dispatcher {
    /// Dispatcher over pre-built transports, tried in the given order.
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self {
            transports,
            mirrored: true,
        }
    }

    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    /// Build one [`HttpTransport`] per configured candidate.
    pub fn from_config(config: &Config, session: Arc<dyn SessionContext>) -> ClientResult<Self> {
        let candidates = build_candidates(&config.backend);
        Self::from_candidates(
            candidates,
            session,
            config.timeouts.request(),
            config.backend.mirrored,
        )
    }

    pub fn from_candidates(
        candidates: Vec<TransportCandidate>,
        session: Arc<dyn SessionContext>,
        default_timeout: std::time::Duration,
        mirrored: bool,
    ) -> ClientResult<Self> {
        if candidates.is_empty() {
            return Err(ClientError::InvalidRequest(
                "no backend candidates configured".into(),
            ));
        }
        let mut transports: Vec<Arc<dyn Transport>> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            transports.push(Arc::new(HttpTransport::new(
                candidate,
                session.clone(),
                default_timeout,
            )?));
        }
        Ok(Self::new(transports).with_mirrored(mirrored))
    }

    pub fn candidate_labels(&self) -> Vec<String> {
        self.transports.iter().map(|t| t.label()).collect()
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Send `spec` through the candidates until one succeeds.
    pub async fn smart_request(&self, spec: &RequestSpec) -> ClientResult<Response> {
        let mut attempts: Vec<AttemptLog> = Vec::new();

        for transport in &self.transports {
            let label = transport.label();
            tracing::debug!(candidate = %label, request = %spec.label(), "attempt");

            match transport.send(spec).await {
                Ok(mut response) => {
                    if !attempts.is_empty() {
                        tracing::info!(
                            candidate = %label,
                            failed = attempts.len(),
                            "request served by fallback candidate"
                        );
                    }
                    response.attempts = attempts;
                    return Ok(response);
                }
                Err(err) if err.is_candidate_failure() => {
                    tracing::warn!(candidate = %label, request = %spec.label(), "candidate failed: {}", err);
                    let may_have_landed = !err.is_connect_failure();
                    attempts.push(AttemptLog::new(label, &err));
                    if !self.mirrored && !spec.method.is_idempotent() && may_have_landed {
                        tracing::warn!(
                            request = %spec.label(),
                            "not re-sending write to another candidate"
                        );
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        tracing::warn!(
            request = %spec.label(),
            attempts = attempts.len(),
            "all backend candidates failed"
        );
        Err(ClientError::BackendUnavailable { attempts })
    }
}

#[async_trait]
impl Transport for Dispatcher {
    fn label(&self) -> String {
        format!("cascade[{}]", self.candidate_labels().join(", "))
    }

    async fn send(&self, spec: &RequestSpec) -> ClientResult<Response> {
        self.smart_request(spec).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedTransport};
    use super::*;
    use serde_json::json;

    fn as_dyn(t: &Arc<ScriptedTransport>) -> Arc<dyn Transport> {
        t.clone()
    }

    #[tokio::test]
    async fn test_short_circuits_at_first_success() {
        for k in 1..=4usize {
            let transports: Vec<Arc<ScriptedTransport>> = (1..=4)
                .map(|i| {
                    let ok = i == k;
                    ScriptedTransport::new(&format!("c{}", i), move |_| {
                        if ok {
                            Script::Ok(json!({ "from": i }))
                        } else {
                            Script::Refused
                        }
                    })
                })
                .collect();
            let dispatcher = Dispatcher::new(transports.iter().map(as_dyn).collect());

            let resp = dispatcher.smart_request(&RequestSpec::get("/x")).await.unwrap();
            assert_eq!(resp.body["from"], k);
            assert_eq!(resp.served_by, format!("c{}", k));

            for (i, t) in transports.iter().enumerate() {
                let expected = if i < k { 1 } else { 0 };
                assert_eq!(t.calls(), expected, "k={} candidate {}", k, i + 1);
            }
        }
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_attempt_in_order() {
        let a = ScriptedTransport::new("a", |_| Script::Refused);
        let b = ScriptedTransport::new("b", |_| Script::Timeout);
        let c = ScriptedTransport::new("c", |_| Script::Http(502));
        let dispatcher = Dispatcher::new(vec![as_dyn(&a), as_dyn(&b), as_dyn(&c)]);

        let err = dispatcher
            .smart_request(&RequestSpec::get("/api/health"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "BACKEND_UNAVAILABLE");
        let labels: Vec<&str> = err
            .attempts()
            .iter()
            .map(|a| a.candidate_label.as_str())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert!(err.attempts()[0].error_message.contains("connection refused"));
        assert!(err.attempts()[1].error_message.contains("timed out"));
        assert!(err.to_string().contains("c: HTTP 502"));
    }

    #[tokio::test]
    async fn test_business_error_is_not_retried() {
        let a = ScriptedTransport::new("a", |_| Script::Http(400));
        let b = ScriptedTransport::new("b", |_| Script::Ok(json!({})));
        let dispatcher = Dispatcher::new(vec![as_dyn(&a), as_dyn(&b)]);

        let err = dispatcher
            .smart_request(&RequestSpec::post("/api/notes", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), Some(400));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_mirrored_write_stops_after_ambiguous_failure() {
        let a = ScriptedTransport::new("a", |_| Script::Timeout);
        let b = ScriptedTransport::new("b", |_| Script::Ok(json!({})));
        let dispatcher =
            Dispatcher::new(vec![as_dyn(&a), as_dyn(&b)]).with_mirrored(false);

        let err = dispatcher
            .smart_request(&RequestSpec::post("/api/notes", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.attempts().len(), 1);
        assert_eq!(b.calls(), 0);

        // Reads still cascade
        let resp = dispatcher.smart_request(&RequestSpec::get("/api/notes")).await;
        assert!(resp.is_ok());
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_mirrored_write_cascades_after_refused_connection() {
        let a = ScriptedTransport::new("a", |_| Script::Refused);
        let b = ScriptedTransport::new("b", |_| Script::Ok(json!({"id": 1})));
        let dispatcher =
            Dispatcher::new(vec![as_dyn(&a), as_dyn(&b)]).with_mirrored(false);

        let resp = dispatcher
            .smart_request(&RequestSpec::post("/api/notes", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.body["id"], 1);
    }

    #[tokio::test]
    async fn test_non_mirrored_patch_cascades_after_timeout() {
        let a = ScriptedTransport::new("a", |_| Script::Timeout);
        let b = ScriptedTransport::new("b", |_| Script::Ok(json!({"completed": true})));
        let dispatcher =
            Dispatcher::new(vec![as_dyn(&a), as_dyn(&b)]).with_mirrored(false);

        let resp = dispatcher
            .smart_request(&RequestSpec::patch("/api/tasks/7", json!({"completed": true})))
            .await
            .unwrap();
        assert_eq!(resp.served_by, "b");
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_carries_failed_attempts() {
        let primary = ScriptedTransport::new("primary", |_| Script::Refused);
        let fallback = ScriptedTransport::new("fallback", |_| Script::Ok(json!({"msg": "ok"})));
        let dispatcher = Dispatcher::new(vec![as_dyn(&primary), as_dyn(&fallback)]);

        let resp = dispatcher.get("/api/notes").await.unwrap();
        assert_eq!(resp.body, json!({"msg": "ok"}));
        assert_eq!(primary.calls() + fallback.calls(), 2);
        assert_eq!(resp.attempts.len(), 1);
        assert_eq!(resp.attempts[0].candidate_label, "primary");

        let direct = Dispatcher::new(vec![as_dyn(&fallback)]);
        assert!(direct.get("/api/notes").await.unwrap().attempts.is_empty());
    }

    #[tokio::test]
    async fn test_convenience_methods_go_through_cascade() {
        let a = ScriptedTransport::new("a", |spec| {
            if spec.method == crate::transport::Method::Delete {
                Script::Ok(json!({"deleted": true}))
            } else {
                Script::Refused
            }
        });
        let dispatcher = Dispatcher::new(vec![as_dyn(&a)]);
        let resp = dispatcher.delete("/api/tasks/3").await.unwrap();
        assert_eq!(resp.body["deleted"], true);
        assert!(dispatcher.get("/api/tasks").await.is_err());
    }

    #[test]
    fn test_from_candidates_rejects_empty() {
        let session: Arc<dyn SessionContext> = Arc::new(crate::session::MemorySession::new());
        let result = Dispatcher::from_candidates(
            Vec::new(),
            session,
            std::time::Duration::from_secs(1),
            true,
        );
        assert!(result.is_err());
    }
}
