//! Search data models.
//!
//! Every category's source records are projected into one [`ResultItem`]
//! shape, and a whole query returns a [`SearchResultEnvelope`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Independently searchable content types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Chats,
    Notes,
    Tasks,
    Documents,
    Reminders,
    Dictionary,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Chats,
        Category::Notes,
        Category::Tasks,
        Category::Documents,
        Category::Reminders,
        Category::Dictionary,
    ];

    /// Plural name used in paths and envelope keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chats => "chats",
            Category::Notes => "notes",
            Category::Tasks => "tasks",
            Category::Documents => "documents",
            Category::Reminders => "reminders",
            Category::Dictionary => "dictionary",
        }
    }

    /// Singular `type` tag carried by each [`ResultItem`].
    pub fn item_type(&self) -> &'static str {
        match self {
            Category::Chats => "chat",
            Category::Notes => "note",
            Category::Tasks => "task",
            Category::Documents => "document",
            Category::Reminders => "reminder",
            Category::Dictionary => "dictionary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower || c.item_type() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown category '{}'. Expected one of: chats, notes, tasks, documents, reminders, dictionary",
                    s
                )
            })
    }
}

/// A search hit, normalized across categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub snippet: String,
    pub date: Option<String>,
    pub url: Option<String>,
    pub metadata: serde_json::Value,
}

/// Outcome for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub items: Vec<ResultItem>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryResult {
    pub fn ok(items: Vec<ResultItem>) -> Self {
        Self {
            count: items.len(),
            items,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of one unified search.
///
/// `total_results` always equals the sum of every category's `count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultEnvelope {
    pub query: String,
    pub total_results: usize,
    pub categories: BTreeMap<Category, CategoryResult>,
}

impl SearchResultEnvelope {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            total_results: 0,
            categories: BTreeMap::new(),
        }
    }

    /// Insert or replace a category's result, keeping the total in sync.
    pub fn record(&mut self, category: Category, result: CategoryResult) {
        if let Some(previous) = self.categories.insert(category, result) {
            self.total_results -= previous.count;
        }
        self.total_results += self.categories[&category].count;
    }

    pub fn get(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.get(&category)
    }
}
