//! Per-entity search adapters and their registry.
//!
//! An adapter knows one entity table: which columns are searchable, whether
//! rows carry a CEFR level, which text field the entity naturally exposes,
//! and how a raw row becomes a [`ResultItem`].

use super::entity::{EntityFamily, EntityKind, Level};
use super::predicate::{build_any_word_where, trim_blank, Predicate};
use super::types::{ResponseFormat, ResultItem};
use crate::error::Result;
use crate::store::{ContentRow, ContentStore, StorePage, StoreQuery};
use tracing::debug;

const CATALOG_FIELDS: &[&str] = &["title", "description", "category", "tags"];
const BLOG_FIELDS: &[&str] = &["title", "excerpt", "content", "category", "tags"];
const MEDIA_FIELDS: &[&str] = &["title", "description", "tags"];
const STORY_FIELDS: &[&str] = &["title", "excerpt", "content", "tags"];
const WRITING_FIELDS: &[&str] = &["title", "description", "content", "tags"];

/// Columns a result's description or excerpt can be drawn from.
const TEXT_COLUMNS: &[&str] = &["description", "excerpt", "content"];

/// The text field an entity exposes in universal responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Description,
    Excerpt,
}

/// Search adapter for one entity kind.
#[derive(Debug, Clone)]
pub struct EntityAdapter {
    kind: EntityKind,
    fields: &'static [&'static str],
    has_level: bool,
    text_source: TextSource,
}

/// Raw rows returned by one adapter.
#[derive(Debug, Clone)]
pub struct AdapterHits {
    pub kind: EntityKind,
    pub rows: Vec<ContentRow>,
    pub total: usize,
}

impl EntityAdapter {
    /// The standard adapter for `kind`.
    pub fn for_kind(kind: EntityKind) -> Self {
        let (fields, has_level, text_source) = match kind {
            EntityKind::Test | EntityKind::Course => {
                (CATALOG_FIELDS, true, TextSource::Description)
            }
            EntityKind::Blog => (BLOG_FIELDS, false, TextSource::Excerpt),
            EntityKind::Video | EntityKind::Audio | EntityKind::Speaking => {
                (MEDIA_FIELDS, true, TextSource::Description)
            }
            EntityKind::Story => (STORY_FIELDS, true, TextSource::Excerpt),
            EntityKind::Writing => (WRITING_FIELDS, true, TextSource::Description),
        };

        Self {
            kind,
            fields,
            has_level,
            text_source,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn has_level(&self) -> bool {
        self.has_level
    }

    pub fn text_source(&self) -> TextSource {
        self.text_source
    }

    /// Text predicate AND-ed with the level constraint.
    ///
    /// Rows with no description, excerpt or content are excluded here so
    /// store totals count exactly the rows [`project`](Self::project) renders.
    /// Returns `None` when a level filter is requested but this entity has no
    /// level column, meaning nothing can match.
    pub fn predicate(&self, tokens: &[String], levels: &[Level]) -> Option<Predicate> {
        let has_text = Predicate::Any(
            TEXT_COLUMNS
                .iter()
                .map(|column| Predicate::non_blank(column))
                .collect(),
        );
        let predicate = build_any_word_where(tokens, self.fields).and(has_text);
        if levels.is_empty() {
            return Some(predicate);
        }
        if !self.has_level {
            return None;
        }
        let levels: Vec<&str> = levels.iter().map(Level::as_str).collect();
        Some(predicate.and(Predicate::one_of("level", &levels)))
    }

    /// Fetch up to `fetch_limit` matching rows in canonical order.
    pub async fn search(
        &self,
        store: &dyn ContentStore,
        tokens: &[String],
        levels: &[Level],
        fetch_limit: usize,
    ) -> Result<AdapterHits> {
        let Some(predicate) = self.predicate(tokens, levels) else {
            debug!("{}: no level column, skipping level-filtered search", self.kind);
            return Ok(AdapterHits {
                kind: self.kind,
                rows: Vec::new(),
                total: 0,
            });
        };

        let query = StoreQuery {
            kind: self.kind,
            predicate,
            limit: fetch_limit,
        };
        let StorePage { rows, total } = store.find(&query).await?;

        debug!("{}: fetched {} of {} matches", self.kind, rows.len(), total);
        Ok(AdapterHits {
            kind: self.kind,
            rows,
            total,
        })
    }

    /// Render a raw row, or `None` if the row has no usable text.
    ///
    /// Rows fetched through [`predicate`](Self::predicate) always render.
    pub fn project(
        &self,
        row: &ContentRow,
        format: ResponseFormat,
        excerpt_chars: usize,
    ) -> Option<ResultItem> {
        let description = non_empty(row.description.as_deref());
        let excerpt = non_empty(row.excerpt.as_deref());
        let content = non_empty(row.content.as_deref());

        let (description, excerpt) = match format {
            ResponseFormat::Compact => {
                let text = description
                    .map(str::to_string)
                    .or_else(|| excerpt.map(|t| truncate_chars(t, excerpt_chars)))
                    .or_else(|| content.map(|t| truncate_chars(t, excerpt_chars)))?;
                (Some(text), None)
            }
            ResponseFormat::Universal => match self.text_source {
                TextSource::Description => {
                    let text = description
                        .map(str::to_string)
                        .or_else(|| content.map(|t| truncate_chars(t, excerpt_chars)));
                    match text {
                        Some(text) => (Some(text), None),
                        None => (None, Some(excerpt?.to_string())),
                    }
                }
                TextSource::Excerpt => {
                    let text = excerpt
                        .map(|t| truncate_chars(t, excerpt_chars))
                        .or_else(|| content.map(|t| truncate_chars(t, excerpt_chars)));
                    match text {
                        Some(text) => (None, Some(text)),
                        None => (Some(description?.to_string()), None),
                    }
                }
            },
        };

        Some(ResultItem {
            id: row.id,
            entity_type: self.kind,
            title: row.title.clone(),
            description,
            excerpt,
            level: row.level.as_deref().and_then(|l| l.parse().ok()),
            tags: row.tags.clone(),
            category: row.category.clone(),
            url: self.url_for(row),
            created_at: row.created_at,
        })
    }

    fn url_for(&self, row: &ContentRow) -> String {
        if let Some(url) = non_empty(row.url.as_deref()) {
            return url.to_string();
        }
        match non_empty(row.slug.as_deref()) {
            Some(slug) => format!("/{}/{}", self.kind.table(), slug),
            None => format!("/{}/{}", self.kind.table(), row.id),
        }
    }
}

/// Adapters for every entity kind.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<EntityAdapter>,
}

impl AdapterRegistry {
    /// Registry with the standard adapter for each kind.
    pub fn standard() -> Self {
        Self {
            adapters: EntityKind::ALL.into_iter().map(EntityAdapter::for_kind).collect(),
        }
    }

    pub fn get(&self, kind: EntityKind) -> &EntityAdapter {
        &self.adapters[kind.priority()]
    }

    /// Adapters selected by an optional family filter, in priority order.
    pub fn select(&self, filter: Option<EntityFamily>) -> Vec<&EntityAdapter> {
        match filter {
            Some(family) => family.kinds().iter().map(|kind| self.get(*kind)).collect(),
            None => self.adapters.iter().collect(),
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(trim_blank).filter(|t| !t.is_empty())
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = trim_blank(text);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
