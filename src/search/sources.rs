//! Category searchers.
//!
//! - [`RemoteSearcher`]: `GET /api/search/{category}?q=` through the
//!   backend cascade.
//! - [`DictionarySearcher`]: word lookup against the public dictionary API.
//!
//! Both fall back to the [`OfflineCache`] when the remote call fails. A
//! category with no cached copy reports the remote error instead.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::cache::OfflineCache;
use super::mapping::{encode, extract_list, map_matching, map_records};
use super::CategorySearcher;
use crate::error::{ClientError, ClientResult};
use crate::models::{Category, ResultItem};
use crate::timeout::with_timeout;
use crate::transport::Transport;

fn fallback_to_cache(
    cache: Option<&OfflineCache>,
    category: Category,
    query: &str,
    remote_err: ClientError,
) -> ClientResult<Vec<ResultItem>> {
    match cache.and_then(|c| c.load(category)) {
        Some(records) => {
            tracing::warn!(
                category = %category,
                cached = records.len(),
                "remote search failed, using offline copy: {}",
                remote_err
            );
            Ok(map_matching(category, &records, query))
        }
        None => Err(remote_err),
    }
}

pub struct RemoteSearcher {
    category: Category,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<OfflineCache>>,
    remote_timeout: Duration,
}

impl RemoteSearcher {
    pub fn new(
        category: Category,
        transport: Arc<dyn Transport>,
        cache: Option<Arc<OfflineCache>>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            category,
            transport,
            cache,
            remote_timeout,
        }
    }

    async fn remote(&self, query: &str) -> ClientResult<Vec<ResultItem>> {
        let path = format!("/api/search/{}?q={}", self.category.as_str(), encode(query));
        let label = format!("{} search", self.category);
        let resp = with_timeout(self.transport.get(&path), self.remote_timeout, &label).await?;
        let records = extract_list(&resp.body, self.category)?;
        Ok(map_records(self.category, &records, query))
    }
}

#[async_trait]
impl CategorySearcher for RemoteSearcher {
    fn category(&self) -> Category {
        self.category
    }

    async fn search(&self, query: &str) -> ClientResult<Vec<ResultItem>> {
        match self.remote(query).await {
            Ok(items) => Ok(items),
            Err(e) => fallback_to_cache(self.cache.as_deref(), self.category, query, e),
        }
    }
}

/// Looks the first word of the query up in a public dictionary.
///
/// The transport must be bound to the dictionary API base URL
/// (`.../entries/en`) and must not carry the backend session token.
pub struct DictionarySearcher {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<OfflineCache>>,
    remote_timeout: Duration,
}

impl DictionarySearcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Option<Arc<OfflineCache>>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            remote_timeout,
        }
    }

    /// Keep looked-up entries so the word still resolves offline.
    fn remember(&self, entries: &[serde_json::Value]) {
        let Some(cache) = &self.cache else {
            return;
        };
        if entries.is_empty() {
            return;
        }
        if let Err(e) = cache.merge(Category::Dictionary, entries, "word") {
            tracing::warn!("failed to cache dictionary entries: {:#}", e);
        }
    }

    async fn remote(&self, word: &str) -> ClientResult<Vec<ResultItem>> {
        let path = format!("/{}", encode(word));
        let lookup = with_timeout(self.transport.get(&path), self.remote_timeout, "dictionary lookup");
        match lookup.await {
            Ok(resp) => {
                let entries = extract_list(&resp.body, Category::Dictionary)?;
                self.remember(&entries);
                Ok(map_records(Category::Dictionary, &entries, word))
            }
            // The API answers 404 for words it does not know.
            Err(ClientError::Http { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CategorySearcher for DictionarySearcher {
    fn category(&self) -> Category {
        Category::Dictionary
    }

    async fn search(&self, query: &str) -> ClientResult<Vec<ResultItem>> {
        let Some(word) = query.split_whitespace().next() else {
            return Ok(Vec::new());
        };
        match self.remote(word).await {
            Ok(items) => Ok(items),
            Err(e) => fallback_to_cache(self.cache.as_deref(), Category::Dictionary, word, e),
        }
    }
}
