//! SQLite content store.

use super::{ContentRow, ContentStore, StorePage, StoreQuery};
use crate::config::DatabaseConfig;
use crate::error::{EslError, Result};
use crate::search::entity::EntityKind;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

const ROW_COLUMNS: &str =
    "id, title, description, excerpt, content, level, tags, category, slug, url, created_at";

/// SQLite-backed content store.
///
/// Holds a small pool of connections so that concurrent adapter queries do
/// not queue behind a single lock. Queries run on the blocking thread pool.
pub struct SqliteStore {
    db_path: Option<PathBuf>,
    pool: Vec<Arc<Mutex<Connection>>>,
    next: AtomicUsize,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_pool_size(db_path, DatabaseConfig::READ_POOL_SIZE)
    }

    /// Open a store with an explicit number of pooled connections.
    pub fn open_with_pool_size(db_path: impl Into<PathBuf>, pool_size: usize) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| EslError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let first = Connection::open(&db_path)?;
        Self::configure_connection(&first)?;
        Self::ensure_schema(&first)?;

        let mut pool = vec![Arc::new(Mutex::new(first))];
        for _ in 1..pool_size.max(1) {
            let conn = Connection::open(&db_path)?;
            Self::configure_connection(&conn)?;
            pool.push(Arc::new(Mutex::new(conn)));
        }

        info!(
            "Opened content store at {} ({} connections)",
            db_path.display(),
            pool.len()
        );

        Ok(Self {
            db_path: Some(db_path),
            pool,
            next: AtomicUsize::new(0),
        })
    }

    /// Open a private in-memory store with a single connection.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: None,
            pool: vec![Arc::new(Mutex::new(conn))],
            next: AtomicUsize::new(0),
        })
    }

    /// Get the database path, if file-backed.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(DatabaseConfig::PRAGMAS)?;
        conn.busy_timeout(std::time::Duration::from_millis(
            DatabaseConfig::BUSY_TIMEOUT_MS as u64,
        ))?;
        Ok(())
    }

    /// Ensure every entity table exists.
    fn ensure_schema(conn: &Connection) -> Result<()> {
        for kind in EntityKind::ALL {
            let table = kind.table();
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    excerpt TEXT,
                    content TEXT,
                    level TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    category TEXT,
                    slug TEXT,
                    url TEXT,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table}(created_at DESC, id);
                CREATE INDEX IF NOT EXISTS idx_{table}_level ON {table}(level);"
            ))?;
        }
        Ok(())
    }

    fn connection(&self) -> Arc<Mutex<Connection>> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        Arc::clone(&self.pool[slot])
    }

    fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| EslError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    /// Insert or update a row in the table for `kind`.
    pub fn upsert(&self, kind: EntityKind, row: &ContentRow) -> Result<()> {
        let conn = self.connection();
        let conn = Self::lock(&conn)?;
        Self::upsert_with(&conn, kind, row)?;
        debug!("Upserted {} {}", kind, row.id);
        Ok(())
    }

    fn upsert_with(conn: &Connection, kind: EntityKind, row: &ContentRow) -> Result<()> {
        let tags_json = serde_json::to_string(&row.tags)?;
        let sql = format!(
            "INSERT INTO {} ({ROW_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                 title=excluded.title,
                 description=excluded.description,
                 excerpt=excluded.excerpt,
                 content=excluded.content,
                 level=excluded.level,
                 tags=excluded.tags,
                 category=excluded.category,
                 slug=excluded.slug,
                 url=excluded.url,
                 created_at=excluded.created_at",
            kind.table()
        );

        conn.execute(
            &sql,
            params![
                row.id,
                row.title,
                row.description,
                row.excerpt,
                row.content,
                row.level,
                tags_json,
                row.category,
                row.slug,
                row.url,
                format_timestamp(&row.created_at),
            ],
        )?;
        Ok(())
    }

    /// Insert many rows in a single transaction. Returns the number written.
    pub fn load_rows(&self, rows: &[(EntityKind, ContentRow)]) -> Result<usize> {
        let conn = self.connection();
        let mut conn = Self::lock(&conn)?;

        let tx = conn.transaction()?;
        for (kind, row) in rows {
            Self::upsert_with(&tx, *kind, row)?;
        }
        tx.commit()?;

        info!("Loaded {} content rows", rows.len());
        Ok(rows.len())
    }

    /// Load a JSON fixture file (see [`parse_fixtures`](super::parse_fixtures)).
    pub fn load_fixtures(&self, path: impl AsRef<Path>) -> Result<usize> {
        let rows = super::read_fixtures(path)?;
        self.load_rows(&rows)
    }

    /// Number of rows in the table for `kind`.
    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.connection();
        let conn = Self::lock(&conn)?;
        let count: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn find_blocking(conn: &Connection, query: &StoreQuery) -> Result<StorePage> {
        let start = Instant::now();
        let table = query.kind.table();
        let fragment = query.predicate.to_sql();

        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, fragment.sql);
        let total: usize =
            conn.query_row(&count_sql, params_from_iter(fragment.params.iter()), |row| {
                row.get(0)
            })?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY created_at DESC, id ASC LIMIT {}",
            ROW_COLUMNS, table, fragment.sql, query.limit
        );
        let mut stmt = conn.prepare(&sql)?;
        // An undecodable row fails the whole query so `total` never counts
        // rows that cannot be returned.
        let content = stmt
            .query_map(params_from_iter(fragment.params.iter()), Self::row_to_content)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(
            "{}: {} of {} rows in {:.2}ms",
            table,
            content.len(),
            total,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(StorePage {
            rows: content,
            total,
        })
    }

    /// Convert a row to a ContentRow.
    fn row_to_content(row: &Row) -> rusqlite::Result<ContentRow> {
        let tags_json: String = row.get(6)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
        })?;

        let created_at: String = row.get(10)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

        Ok(ContentRow {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            excerpt: row.get(3)?,
            content: row.get(4)?,
            level: row.get(5)?,
            tags,
            category: row.get(7)?,
            slug: row.get(8)?,
            url: row.get(9)?,
            created_at,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn find(&self, query: &StoreQuery) -> Result<StorePage> {
        let conn = self.connection();
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            Self::find_blocking(&conn, &query)
        })
        .await
        .map_err(|e| EslError::Other(format!("Store query task failed: {}", e)))?
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::adapter::EntityAdapter;
    use crate::search::predicate::{build_any_word_where, Predicate};
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("content.db")).unwrap();
        (store, temp_dir)
    }

    fn create_test_row(id: i64, title: &str, level: &str, day: u32) -> ContentRow {
        let created_at = Utc.with_ymd_and_hms(2024, 2, day, 9, 30, 0).unwrap();
        let mut row = ContentRow::new(id, title, created_at);
        row.description = Some(format!("About {}", title.to_lowercase()));
        row.level = Some(level.to_string());
        row.tags = vec!["esl".to_string()];
        row
    }

    fn text_query(kind: EntityKind, words: &[&str], fields: &[&str], limit: usize) -> StoreQuery {
        let tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        StoreQuery {
            kind,
            predicate: build_any_word_where(&tokens, fields),
            limit,
        }
    }

    fn ids(page: &StorePage) -> Vec<i64> {
        page.rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_upsert_and_count() {
        let (store, _temp) = create_test_store();

        let rows = [
            create_test_row(1, "Grammar Basics", "a1", 1),
            create_test_row(1, "Grammar Basics v2", "a1", 1),
            create_test_row(2, "Business English", "b2", 2),
        ];
        for row in &rows {
            store.upsert(EntityKind::Course, row).unwrap();
        }

        assert_eq!(store.count(EntityKind::Course).unwrap(), 2);
        assert_eq!(store.count(EntityKind::Blog).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_matches_case_insensitively() {
        let (store, _temp) = create_test_store();
        let rows = [
            create_test_row(1, "GRAMMAR Basics", "a1", 1),
            create_test_row(2, "Business English", "b2", 2),
            create_test_row(3, "Pronunciation", "b1", 3),
        ];
        for row in &rows {
            store.upsert(EntityKind::Course, row).unwrap();
        }

        let query = text_query(EntityKind::Course, &["grammar", "english"], &["title"], 10);
        let page = store.find(&query).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(ids(&page), vec![2, 1]);
        assert_eq!(page.rows[0].tags, vec!["esl".to_string()]);
    }

    #[tokio::test]
    async fn test_find_with_level_and_limit() {
        let (store, _temp) = create_test_store();
        for id in 1..=6 {
            let level = if id % 2 == 0 { "B1" } else { "c1" };
            let row = create_test_row(id, &format!("Lesson {}", id), level, id as u32);
            store.upsert(EntityKind::Video, &row).unwrap();
        }

        let query = StoreQuery {
            kind: EntityKind::Video,
            predicate: Predicate::MatchAll.and(Predicate::one_of("level", &["b1"])),
            limit: 2,
        };
        let page = store.find(&query).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(ids(&page), vec![6, 4]);
    }

    #[tokio::test]
    async fn test_find_agrees_with_memory_store() {
        let (store, _temp) = create_test_store();
        let memory = MemoryStore::new();

        let titles = ["50% off grammar", "Phrasal_verbs", "Irregular verbs", "Idioms"];
        for (i, title) in titles.iter().enumerate() {
            let row = create_test_row(i as i64 + 1, title, "b2", i as u32 + 1);
            store.upsert(EntityKind::Blog, &row).unwrap();
            memory.insert_row(EntityKind::Blog, row);
        }

        for words in [vec!["verbs"], vec!["50"], vec!["_"], vec!["idioms", "grammar"]] {
            let query = text_query(EntityKind::Blog, &words, &["title", "description"], 10);
            let sql_ids = ids(&store.find(&query).await.unwrap());
            let mem_ids = ids(&memory.find(&query).await.unwrap());
            assert_eq!(sql_ids, mem_ids, "mismatch for {:?}", words);
        }
    }

    #[tokio::test]
    async fn test_blank_text_excluded_by_both_stores() {
        let (store, _temp) = create_test_store();
        let memory = MemoryStore::new();

        let texts = [Some("Real text"), None, Some(""), Some(" \t\r\n "), Some("  padded  ")];
        for (i, text) in texts.iter().enumerate() {
            let mut row = create_test_row(i as i64 + 1, "Grammar lesson", "a1", i as u32 + 1);
            row.description = text.map(str::to_string);
            store.upsert(EntityKind::Writing, &row).unwrap();
            memory.insert_row(EntityKind::Writing, row);
        }

        let adapter = EntityAdapter::for_kind(EntityKind::Writing);
        for tokens in [vec![], vec!["grammar".to_string()]] {
            let query = StoreQuery {
                kind: EntityKind::Writing,
                predicate: adapter.predicate(&tokens, &[]).unwrap(),
                limit: 10,
            };
            let sql_page = store.find(&query).await.unwrap();
            let mem_page = memory.find(&query).await.unwrap();

            assert_eq!(sql_page.total, 2);
            assert_eq!(ids(&sql_page), vec![5, 1]);
            assert_eq!(ids(&sql_page), ids(&mem_page));
            assert_eq!(sql_page.total, mem_page.total);
        }
    }

    #[tokio::test]
    async fn test_undecodable_row_fails_query() {
        let (store, _temp) = create_test_store();
        store.upsert(EntityKind::Story, &create_test_row(1, "Good story", "a2", 1)).unwrap();
        store.upsert(EntityKind::Story, &create_test_row(2, "Bad story", "a2", 2)).unwrap();
        {
            let conn = store.connection();
            let conn = SqliteStore::lock(&conn).unwrap();
            conn.execute("UPDATE stories SET created_at = 'yesterday' WHERE id = 2", [])
                .unwrap();
        }

        let query = text_query(EntityKind::Story, &["story"], &["title"], 10);
        assert!(store.find(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_tags_fail_query() {
        let (store, _temp) = create_test_store();
        store.upsert(EntityKind::Audio, &create_test_row(1, "Dialogue", "a1", 1)).unwrap();
        {
            let conn = store.connection();
            let conn = SqliteStore::lock(&conn).unwrap();
            conn.execute("UPDATE audios SET tags = 'not json' WHERE id = 1", [])
                .unwrap();
        }

        let query = text_query(EntityKind::Audio, &[], &["title"], 10);
        assert!(store.find(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_load_fixtures() {
        let (store, temp) = create_test_store();
        let path = temp.path().join("fixtures.json");
        std::fs::write(
            &path,
            r#"{"stories": [
                {"id": 1, "title": "The Lost Key", "excerpt": "A short story",
                 "createdAt": "2024-04-01T10:00:00Z"},
                {"id": 2, "title": "Rainy Day", "excerpt": "Another story",
                 "createdAt": "2024-04-02T10:00:00Z"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(store.load_fixtures(&path).unwrap(), 2);
        assert_eq!(store.count(EntityKind::Story).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.db_path().is_none());
        store.upsert(EntityKind::Test, &create_test_row(9, "Placement test", "a2", 4)).unwrap();

        let page = store
            .find(&text_query(EntityKind::Test, &["placement"], &["title"], 5))
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 1);
        let expected = Utc.with_ymd_and_hms(2024, 2, 4, 9, 30, 0).unwrap();
        assert_eq!(page.rows[0].created_at, expected);
    }
}
