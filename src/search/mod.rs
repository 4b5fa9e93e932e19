//! Unified search across every content category.
//!
//! [`SearchAggregator::search_all`] fans one query out to a searcher per
//! enabled [`Category`], runs them concurrently, and waits for all of them.
//! A failing or slow category never blanks out the others: it shows up in
//! the envelope with `count: 0` and an `error` message.
//!
//! # Sub-modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`snippet`] | Match-centred excerpts |
//! | [`mapping`] | Source JSON → [`ResultItem`] per category |
//! | [`sources`] | Remote and dictionary searchers with cache fallback |
//! | [`cache`] | Offline per-category JSON copies |
//! | [`suggestions`] | Search-box suggestions |

pub mod cache;
pub mod mapping;
pub mod snippet;
pub mod sources;
pub mod suggestions;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::candidates::TransportCandidate;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::ClientResult;
use crate::models::{Category, CategoryResult, ResultItem, SearchResultEnvelope};
use crate::session::MemorySession;
use crate::timeout::with_timeout;
use crate::transport::{HttpTransport, Transport};

use cache::OfflineCache;
use sources::{DictionarySearcher, RemoteSearcher};
use suggestions::SuggestionSource;

/// Searches one category.
#[async_trait]
pub trait CategorySearcher: Send + Sync {
    fn category(&self) -> Category;

    async fn search(&self, query: &str) -> ClientResult<Vec<ResultItem>>;
}

/// Which categories a search covers. Defaults to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub include_chats: bool,
    pub include_notes: bool,
    pub include_tasks: bool,
    pub include_documents: bool,
    pub include_reminders: bool,
    pub include_dictionary: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_chats: true,
            include_notes: true,
            include_tasks: true,
            include_documents: true,
            include_reminders: true,
            include_dictionary: true,
        }
    }
}

impl SearchOptions {
    pub fn none() -> Self {
        Self {
            include_chats: false,
            include_notes: false,
            include_tasks: false,
            include_documents: false,
            include_reminders: false,
            include_dictionary: false,
        }
    }

    pub fn only(categories: &[Category]) -> Self {
        let mut opts = Self::none();
        for c in categories {
            opts.set(*c, true);
        }
        opts
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        match category {
            Category::Chats => self.include_chats = enabled,
            Category::Notes => self.include_notes = enabled,
            Category::Tasks => self.include_tasks = enabled,
            Category::Documents => self.include_documents = enabled,
            Category::Reminders => self.include_reminders = enabled,
            Category::Dictionary => self.include_dictionary = enabled,
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Chats => self.include_chats,
            Category::Notes => self.include_notes,
            Category::Tasks => self.include_tasks,
            Category::Documents => self.include_documents,
            Category::Reminders => self.include_reminders,
            Category::Dictionary => self.include_dictionary,
        }
    }
}

pub struct SearchAggregator {
    searchers: Vec<Arc<dyn CategorySearcher>>,
    /// Upper bound for one category, including any cache fallback.
    category_timeout: Duration,
    suggestions: Option<SuggestionSource>,
}

impl SearchAggregator {
    pub fn new(category_timeout: Duration) -> Self {
        Self {
            searchers: Vec::new(),
            category_timeout,
            suggestions: None,
        }
    }

    /// Add a searcher, replacing any existing one for the same category.
    pub fn register(&mut self, searcher: Arc<dyn CategorySearcher>) {
        let category = searcher.category();
        self.searchers.retain(|s| s.category() != category);
        self.searchers.push(searcher);
    }

    pub fn with_suggestions(mut self, source: SuggestionSource) -> Self {
        self.suggestions = Some(source);
        self
    }

    pub fn categories(&self) -> Vec<Category> {
        self.searchers.iter().map(|s| s.category()).collect()
    }

    /// Standard wiring: five backend categories through the cascade, the
    /// dictionary through its own unauthenticated transport, and the
    /// offline cache if `search.cache_dir` is set.
    pub fn from_config(config: &Config, dispatcher: Arc<Dispatcher>) -> ClientResult<Self> {
        let remote_timeout = config.timeouts.search();
        let cache = config
            .search
            .cache_dir
            .as_ref()
            .map(|dir| Arc::new(OfflineCache::new(dir)));
        let backend: Arc<dyn Transport> = dispatcher;

        let mut aggregator = Self::new(remote_timeout * 2)
            .with_suggestions(SuggestionSource::new(backend.clone(), remote_timeout));

        for category in [
            Category::Chats,
            Category::Notes,
            Category::Tasks,
            Category::Documents,
            Category::Reminders,
        ] {
            aggregator.register(Arc::new(RemoteSearcher::new(
                category,
                backend.clone(),
                cache.clone(),
                remote_timeout,
            )));
        }

        let dictionary = HttpTransport::new(
            TransportCandidate::new(&config.search.dictionary_url, false),
            Arc::new(MemorySession::new()),
            remote_timeout,
        )?;
        aggregator.register(Arc::new(DictionarySearcher::new(
            Arc::new(dictionary),
            cache,
            remote_timeout,
        )));

        Ok(aggregator)
    }

    /// Search every enabled category concurrently.
    ///
    /// Never fails. Every enabled category with a registered searcher is
    /// present in the envelope; categories that failed carry an `error`.
    /// A blank query returns an empty envelope without any requests.
    pub async fn search_all(&self, query: &str, options: &SearchOptions) -> SearchResultEnvelope {
        let query = query.trim();
        let mut envelope = SearchResultEnvelope::new(query);
        if query.is_empty() {
            return envelope;
        }

        let mut tasks = JoinSet::new();
        for searcher in self.searchers.iter().filter(|s| options.includes(s.category())) {
            let category = searcher.category();
            // Placeholder in case the task dies without reporting back.
            envelope.record(category, CategoryResult::failed("search did not complete"));

            let searcher = searcher.clone();
            let query = query.to_string();
            let deadline = self.category_timeout;
            tasks.spawn(async move {
                let label = format!("{} search", category);
                let result = with_timeout(searcher.search(&query), deadline, &label).await;
                (category, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((category, Ok(items))) => {
                    tracing::debug!(category = %category, count = items.len(), "category settled");
                    envelope.record(category, CategoryResult::ok(items));
                }
                Ok((category, Err(e))) => {
                    tracing::warn!(category = %category, "category search failed: {}", e);
                    envelope.record(category, CategoryResult::failed(e.user_message()));
                }
                Err(e) => {
                    tracing::error!("search task aborted: {}", e);
                }
            }
        }

        tracing::info!(
            query,
            total = envelope.total_results,
            categories = envelope.categories.len(),
            "search complete"
        );
        envelope
    }

    /// Suggestions for a partial query. Falls back to static keywords.
    pub async fn get_search_suggestions(&self, query: &str) -> Vec<String> {
        match &self.suggestions {
            Some(source) => source.get_search_suggestions(query).await,
            None => suggestions::static_suggestions(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    struct FixedSearcher {
        category: Category,
        outcome: Result<usize, String>,
        delay: Duration,
    }

    impl FixedSearcher {
        fn ok(category: Category, n: usize) -> Arc<Self> {
            Arc::new(Self {
                category,
                outcome: Ok(n),
                delay: Duration::ZERO,
            })
        }

        fn failing(category: Category, msg: &str) -> Arc<Self> {
            Arc::new(Self {
                category,
                outcome: Err(msg.to_string()),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl CategorySearcher for FixedSearcher {
        fn category(&self) -> Category {
            self.category
        }

        async fn search(&self, query: &str) -> ClientResult<Vec<ResultItem>> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.outcome {
                Ok(n) => Ok((0..*n)
                    .map(|i| ResultItem {
                        id: i.to_string(),
                        kind: self.category.item_type().to_string(),
                        title: format!("{} {}", query, i),
                        content: String::new(),
                        snippet: String::new(),
                        date: None,
                        url: None,
                        metadata: serde_json::Value::Null,
                    })
                    .collect()),
                Err(msg) => Err(ClientError::Network {
                    message: msg.clone(),
                    connect: true,
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_two_failures_do_not_sink_search() {
        let mut agg = SearchAggregator::new(Duration::from_secs(1));
        agg.register(FixedSearcher::ok(Category::Chats, 2));
        agg.register(FixedSearcher::failing(Category::Notes, "notes down"));
        agg.register(FixedSearcher::ok(Category::Tasks, 3));
        agg.register(FixedSearcher::failing(Category::Documents, "docs down"));
        agg.register(FixedSearcher::ok(Category::Reminders, 1));
        agg.register(FixedSearcher::ok(Category::Dictionary, 4));

        let env = agg.search_all("plan", &SearchOptions::default()).await;

        assert_eq!(env.categories.len(), 6);
        assert_eq!(env.total_results, 2 + 3 + 1 + 4);
        for failed in [Category::Notes, Category::Documents] {
            let r = env.get(failed).unwrap();
            assert_eq!(r.count, 0);
            assert!(r.items.is_empty());
            assert!(!r.error.as_deref().unwrap().is_empty());
        }
        assert!(env.get(Category::Notes).unwrap().error.as_deref().unwrap().contains("notes down"));
        let sum: usize = env.categories.values().map(|r| r.count).sum();
        assert_eq!(sum, env.total_results);
    }

    #[tokio::test]
    async fn test_disabled_categories_are_not_queried() {
        let mut agg = SearchAggregator::new(Duration::from_secs(1));
        agg.register(FixedSearcher::ok(Category::Notes, 1));
        agg.register(FixedSearcher::ok(Category::Tasks, 1));

        let env = agg
            .search_all("x", &SearchOptions::only(&[Category::Notes]))
            .await;
        assert_eq!(env.categories.len(), 1);
        assert!(env.get(Category::Tasks).is_none());
        assert_eq!(env.total_results, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_category_times_out_alone() {
        let mut agg = SearchAggregator::new(Duration::from_millis(100));
        agg.register(FixedSearcher::ok(Category::Notes, 1));
        agg.register(Arc::new(FixedSearcher {
            category: Category::Tasks,
            outcome: Ok(5),
            delay: Duration::from_secs(10),
        }));

        let env = agg.search_all("project", &SearchOptions::default()).await;
        assert_eq!(env.get(Category::Notes).unwrap().count, 1);
        let tasks = env.get(Category::Tasks).unwrap();
        assert_eq!(tasks.count, 0);
        assert!(tasks.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(env.total_results, 1);
    }

    #[tokio::test]
    async fn test_blank_query_short_circuits() {
        let mut agg = SearchAggregator::new(Duration::from_secs(1));
        agg.register(FixedSearcher::ok(Category::Notes, 1));
        let env = agg.search_all("   ", &SearchOptions::default()).await;
        assert!(env.categories.is_empty());
        assert_eq!(env.total_results, 0);
    }

    #[test]
    fn test_register_replaces_same_category() {
        let mut agg = SearchAggregator::new(Duration::from_secs(1));
        agg.register(FixedSearcher::ok(Category::Notes, 1));
        agg.register(FixedSearcher::ok(Category::Notes, 2));
        assert_eq!(agg.categories(), vec![Category::Notes]);
    }

    #[tokio::test]
    async fn test_suggestions_without_source_use_static_list() {
        let agg = SearchAggregator::new(Duration::from_secs(1));
        assert_eq!(agg.get_search_suggestions("remind").await, vec!["reminders"]);
    }
}
