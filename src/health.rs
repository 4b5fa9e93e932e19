//! Backend liveness probing with cold-start wake-up.
//!
//! Low-tier hosting puts idle backends to sleep, and the first request after
//! that can take many seconds. [`HealthProber::check_backend_health`]
//! therefore runs in two phases:
//!
//! 1. **Wake**: one request to `/` with a long deadline. Its outcome is
//!    ignored; it only exists to start the server.
//! 2. **Probe**: the configured probe paths, in order, with a short
//!    deadline each. The first path that produces *any* HTTP response, even
//!    a 404 or 500, proves the server process is up and routing.
//!
//! Only when every probe fails without an HTTP response is the backend
//! reported as disconnected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{ClientError, ClientResult};
use crate::transport::RequestSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityVerdict {
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responding_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ConnectivityVerdict {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WakeOutcome {
    pub success: bool,
    pub message: String,
}

pub struct HealthProber {
    dispatcher: Arc<Dispatcher>,
    probe_paths: Vec<String>,
    wake_timeout: Duration,
    probe_timeout: Duration,
}

impl HealthProber {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        probe_paths: Vec<String>,
        wake_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            probe_paths,
            wake_timeout,
            probe_timeout,
        }
    }

    pub fn from_config(dispatcher: Arc<Dispatcher>, config: &Config) -> Self {
        Self::new(
            dispatcher,
            config.health.probe_paths.clone(),
            config.timeouts.wake(),
            config.timeouts.probe(),
        )
    }

    /// Hit `/` with the long wake deadline. Any HTTP response counts.
    pub async fn wake_up_backend(&self) -> WakeOutcome {
        let spec = RequestSpec::get("/").with_timeout(self.wake_timeout);
        match self.dispatcher.smart_request(&spec).await {
            Ok(resp) => WakeOutcome {
                success: true,
                message: format!("backend awake ({} answered {})", resp.served_by, resp.status),
            },
            Err(e) => match e.answered_status() {
                Some(status) => WakeOutcome {
                    success: true,
                    message: format!("backend awake (HTTP {})", status),
                },
                None => {
                    tracing::warn!("wake-up failed: {}", e);
                    WakeOutcome {
                        success: false,
                        message: format!("backend did not wake: {}", e),
                    }
                }
            },
        }
    }

    /// Wake the backend, then probe for liveness.
    pub async fn check_backend_health(&self) -> ConnectivityVerdict {
        let wake = self.wake_up_backend().await;
        tracing::debug!(success = wake.success, "wake phase done: {}", wake.message);
        self.probe().await
    }

    /// Probe phase only.
    pub async fn probe(&self) -> ConnectivityVerdict {
        let mut failures: Vec<String> = Vec::new();

        for path in &self.probe_paths {
            let spec = RequestSpec::get(path.as_str()).with_timeout(self.probe_timeout);
            let answered = match self.dispatcher.smart_request(&spec).await {
                Ok(resp) => Some(resp.status),
                // A gateway 503 exhausts the cascade but is still an answer.
                Err(e) => {
                    let status = e.answered_status();
                    if status.is_none() {
                        tracing::debug!(endpoint = %path, "probe got no response: {}", e);
                        failures.push(format!("{}: {}", path, e));
                    }
                    status
                }
            };

            if let Some(status) = answered {
                tracing::info!(endpoint = %path, status, "backend connected");
                return ConnectivityVerdict {
                    status: ConnectionStatus::Connected,
                    responding_endpoint: Some(path.clone()),
                    http_status: Some(status),
                    diagnostic: None,
                    checked_at: Utc::now(),
                };
            }
        }

        tracing::warn!(probes = self.probe_paths.len(), "backend disconnected");
        ConnectivityVerdict {
            status: ConnectionStatus::Disconnected,
            responding_endpoint: None,
            http_status: None,
            diagnostic: Some(format!(
                "no endpoint reachable after {} probes: {}",
                self.probe_paths.len(),
                failures.join(" | ")
            )),
            checked_at: Utc::now(),
        }
    }

    /// Run the full check once, then re-probe every `interval` in the
    /// background. Verdicts are published on the returned monitor.
    ///
    /// A zero interval is rejected.
    pub fn spawn_monitor(self: Arc<Self>, interval: Duration) -> ClientResult<HealthMonitor> {
        if interval.is_zero() {
            return Err(ClientError::InvalidRequest(
                "health monitor interval must be greater than zero".into(),
            ));
        }
        let (tx, rx) = watch::channel(None);
        let prober = self;

        let handle = tokio::spawn(async move {
            let first = prober.check_backend_health().await;
            if tx.send(Some(first)).is_err() {
                return;
            }
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let verdict = prober.probe().await;
                if tx.send(Some(verdict)).is_err() {
                    break;
                }
            }
        });

        Ok(HealthMonitor { rx, handle })
    }
}

/// Handle to a background health loop. Dropping it stops the loop.
pub struct HealthMonitor {
    rx: watch::Receiver<Option<ConnectivityVerdict>>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Most recent verdict, if the first check has finished.
    pub fn latest(&self) -> Option<ConnectivityVerdict> {
        self.rx.borrow().clone()
    }

    /// Wait for the next verdict. `None` once the loop has stopped.
    pub async fn changed(&mut self) -> Option<ConnectivityVerdict> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
