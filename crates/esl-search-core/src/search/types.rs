//! Request and response types for cross-entity search.

use super::entity::{EntityFamily, EntityKind, Level};
use crate::config::{SearchConfig, SearchOptions};
use crate::error::{EslError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Every item carries a non-empty `description`.
    Compact,
    /// Items carry `description` or `excerpt`, whichever the entity provides.
    #[default]
    Universal,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Compact => "compact",
            ResponseFormat::Universal => "universal",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = EslError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(ResponseFormat::Compact),
            "universal" => Ok(ResponseFormat::Universal),
            _ => Err(EslError::validation(
                "format",
                format!("expected 'compact' or 'universal', got '{}'", s),
            )),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A search request as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub filter: Option<EntityFamily>,
    pub levels: Vec<Level>,
    pub page: usize,
    /// Page size. `None` takes the service's default.
    pub limit: Option<usize>,
    pub format: ResponseFormat,
}

/// The slice of merged results a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Index of the first merged result on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Index one past the last merged result on this page.
    pub fn end(&self) -> usize {
        self.page.saturating_mul(self.limit)
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter: None,
            levels: Vec::new(),
            page: SearchConfig::DEFAULT_PAGE,
            limit: None,
            format: ResponseFormat::default(),
        }
    }

    pub fn filter(mut self, family: EntityFamily) -> Self {
        self.filter = Some(family);
        self
    }

    pub fn levels(mut self, levels: Vec<Level>) -> Self {
        self.levels = levels;
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Resolve the page window against the service options.
    ///
    /// A missing limit takes `default_limit` and a limit above `max_limit` is
    /// clamped to it. Zero page or limit is rejected.
    pub fn window(&self, options: &SearchOptions) -> Result<PageWindow> {
        if self.page == 0 {
            return Err(EslError::validation("page", "must be at least 1"));
        }
        let limit = self.limit.unwrap_or(options.default_limit);
        if limit == 0 {
            return Err(EslError::validation("limit", "must be at least 1"));
        }
        Ok(PageWindow {
            page: self.page,
            limit: limit.min(options.max_limit),
        })
    }
}

/// A single search hit rendered for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub id: i64,
    pub entity_type: EntityKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Merged, paginated search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub mode: ResponseFormat,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<EntityFamily>,
    pub page: usize,
    pub limit: usize,
    /// Matches across all searched kinds, before pagination.
    pub total: usize,
    pub has_more: bool,
    /// Set when at least one entity kind failed and contributed nothing.
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_entities: Vec<EntityKind>,
    pub took_ms: f64,
    pub results: Vec<ResultItem>,
}
