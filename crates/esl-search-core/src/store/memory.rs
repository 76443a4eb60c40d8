//! In-process content store.

use super::{sort_canonical, ContentRow, ContentStore, StorePage, StoreQuery};
use crate::error::{EslError, Result};
use crate::search::entity::EntityKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Content store holding every row in memory.
///
/// Evaluates predicates with [`Predicate::matches`](crate::Predicate::matches),
/// so it agrees with [`SqliteStore`](super::SqliteStore) on which rows match.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<EntityKind, Vec<ContentRow>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(kind, row)` pairs, e.g. parsed fixtures.
    pub fn from_rows(rows: impl IntoIterator<Item = (EntityKind, ContentRow)>) -> Self {
        let store = Self::new();
        for (kind, row) in rows {
            store.insert_row(kind, row);
        }
        store
    }

    /// Insert a row, replacing any existing row with the same id.
    pub fn insert_row(&self, kind: EntityKind, row: ContentRow) {
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable.
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let table = tables.entry(kind).or_default();
        table.retain(|existing| existing.id != row.id);
        table.push(row);
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.get(&kind).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find(&self, query: &StoreQuery) -> Result<StorePage> {
        let tables = self.tables.read().map_err(|_| EslError::Database {
            message: "Failed to acquire memory store lock".to_string(),
            source: None,
        })?;

        let mut rows: Vec<ContentRow> = tables
            .get(&query.kind)
            .map(|table| {
                table
                    .iter()
                    .filter(|row| query.predicate.matches(*row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_canonical(&mut rows);
        let total = rows.len();
        rows.truncate(query.limit);

        Ok(StorePage { rows, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::predicate::{build_any_word_where, Predicate};
    use chrono::{TimeZone, Utc};

    fn row(id: i64, title: &str, day: u32) -> ContentRow {
        ContentRow::new(id, title, Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_limits() {
        let store = MemoryStore::from_rows([
            (EntityKind::Story, row(1, "Fox story", 1)),
            (EntityKind::Story, row(2, "Bear story", 3)),
            (EntityKind::Story, row(3, "Recipe", 2)),
            (EntityKind::Story, row(4, "Owl story", 2)),
        ]);

        let query = StoreQuery {
            kind: EntityKind::Story,
            predicate: build_any_word_where(&["story".to_string()], &["title"]),
            limit: 2,
        };
        let page = store.find(&query).await.unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<i64> = page.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_find_missing_table_is_empty() {
        let store = MemoryStore::new();
        let query = StoreQuery {
            kind: EntityKind::Blog,
            predicate: Predicate::MatchAll,
            limit: 10,
        };
        let page = store.find(&query).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let store = MemoryStore::new();
        store.insert_row(EntityKind::Blog, row(1, "Draft", 1));
        store.insert_row(EntityKind::Blog, row(1, "Published", 1));
        assert_eq!(store.count(EntityKind::Blog), 1);
    }
}
