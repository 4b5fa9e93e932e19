//! Ordered list of base URLs the dispatcher tries.

use serde::Serialize;
use std::fmt;

use crate::config::BackendConfig;

/// One base URL the dispatcher may route a request through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCandidate {
    pub base_url: String,
    pub is_proxy: bool,
}

impl TransportCandidate {
    pub fn new(base_url: &str, is_proxy: bool) -> Self {
        Self {
            base_url: normalize_base(base_url),
            is_proxy,
        }
    }

    /// Label used in logs and attempt trails.
    pub fn label(&self) -> String {
        if self.is_proxy {
            format!("proxy ({})", self.base_url)
        } else {
            self.base_url.clone()
        }
    }
}

impl fmt::Display for TransportCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Build the candidate list: `[proxy?] + [primary] + [fallbacks]`.
///
/// The proxy only appears when `dev_proxy` is set and a proxy URL is
/// configured. No base URL appears twice; later duplicates are dropped.
pub fn build_candidates(backend: &BackendConfig) -> Vec<TransportCandidate> {
    let mut out: Vec<TransportCandidate> = Vec::new();

    let mut push = |url: &str, is_proxy: bool| {
        let candidate = TransportCandidate::new(url, is_proxy);
        if candidate.base_url.is_empty() {
            return;
        }
        if out.iter().any(|c| c.base_url == candidate.base_url) {
            return;
        }
        out.push(candidate);
    };

    if backend.dev_proxy {
        if let Some(proxy) = &backend.proxy_url {
            push(proxy, true);
        }
    }
    push(&backend.primary_url, false);
    for url in &backend.fallback_urls {
        push(url, false);
    }

    out
}
