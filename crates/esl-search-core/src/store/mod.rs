//! Content persistence behind the search core.
//!
//! The aggregator only sees the [`ContentStore`] trait. Two implementations
//! ship with the crate:
//! - [`SqliteStore`]: rusqlite-backed tables, one per entity kind
//! - [`MemoryStore`]: in-process rows for tests, demos and benchmarks

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::{EslError, Result};
use crate::search::entity::EntityKind;
use crate::search::predicate::{FieldSource, Predicate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

/// A raw content record as persisted.
///
/// Every entity table shares this layout; each kind fills the text columns it
/// naturally owns (blogs and stories carry `excerpt`, most others
/// `description`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRow {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentRow {
    /// Minimal row with only the required columns set.
    pub fn new(id: i64, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            excerpt: None,
            content: None,
            level: None,
            tags: Vec::new(),
            category: None,
            slug: None,
            url: None,
            created_at,
        }
    }
}

impl FieldSource for ContentRow {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "title" => Some(Cow::Borrowed(&self.title)),
            "description" => self.description.as_deref().map(Cow::Borrowed),
            "excerpt" => self.excerpt.as_deref().map(Cow::Borrowed),
            "content" => self.content.as_deref().map(Cow::Borrowed),
            "level" => self.level.as_deref().map(Cow::Borrowed),
            "category" => self.category.as_deref().map(Cow::Borrowed),
            "slug" => self.slug.as_deref().map(Cow::Borrowed),
            "tags" => Some(Cow::Owned(self.tags.join(" "))),
            _ => None,
        }
    }
}

/// A filtered, limited read against one entity table.
///
/// Rows always come back in the canonical order: `created_at` descending,
/// then `id` ascending.
#[derive(Debug, Clone)]
pub struct StoreQuery {
    pub kind: EntityKind,
    pub predicate: Predicate,
    pub limit: usize,
}

/// Rows returned for a [`StoreQuery`] plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct StorePage {
    pub rows: Vec<ContentRow>,
    pub total: usize,
}

/// Read access to the content tables.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Find rows of `query.kind` matching `query.predicate`.
    async fn find(&self, query: &StoreQuery) -> Result<StorePage>;
}

/// Sort rows into the canonical store order.
pub fn sort_canonical(rows: &mut [ContentRow]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

/// Parse a fixture document of the form `{ "<table>": [row, ...] }`.
pub fn parse_fixtures(json: &str) -> Result<Vec<(EntityKind, ContentRow)>> {
    let tables: BTreeMap<String, Vec<ContentRow>> = serde_json::from_str(json)?;

    let mut rows = Vec::new();
    for (table, table_rows) in tables {
        let kind = EntityKind::from_table(&table).ok_or_else(|| EslError::Validation {
            field: "fixtures".to_string(),
            message: format!("unknown content table '{}'", table),
        })?;
        rows.extend(table_rows.into_iter().map(|row| (kind, row)));
    }

    Ok(rows)
}

/// Read and parse a fixture file.
pub fn read_fixtures(path: impl AsRef<Path>) -> Result<Vec<(EntityKind, ContentRow)>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| EslError::io_with_path(e, path))?;
    parse_fixtures(&json)
}
