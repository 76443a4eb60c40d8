//! Cross-entity search aggregation.

use super::adapter::{AdapterHits, AdapterRegistry, EntityAdapter};
use super::entity::EntityKind;
use super::tokenizer::tokenize_query;
use super::types::{ResultItem, SearchRequest, SearchResponse};
use crate::config::SearchOptions;
use crate::error::{EslError, Result};
use crate::store::{ContentRow, ContentStore};
use futures::future::join_all;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Fans a query out to the entity adapters and merges the results.
///
/// Merged order is entity priority (tests, courses, blogs, videos, audios,
/// stories, writings, speakings), then `created_at` descending, then `id`
/// ascending. Pagination applies to that merged order.
pub struct SearchService {
    store: Arc<dyn ContentStore>,
    registry: AdapterRegistry,
    options: SearchOptions,
}

impl SearchService {
    /// Create a service with default options.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            registry: AdapterRegistry::standard(),
            options: SearchOptions::default(),
        }
    }

    /// Create a service with custom options.
    pub fn with_options(store: Arc<dyn ContentStore>, options: SearchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store,
            registry: AdapterRegistry::standard(),
            options,
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Run a search request.
    ///
    /// A failing or slow entity kind contributes no results and is listed in
    /// `failed_entities`. The call only fails when the request is invalid or
    /// every selected kind failed.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let window = request.window(&self.options)?;
        let start = Instant::now();

        let tokens = tokenize_query(&request.query);
        let adapters = self.registry.select(request.filter);
        let fetch_limit = window.end().min(self.options.per_entity_cap);

        debug!(
            "search {:?}: {} tokens, {} adapters, fetch_limit={}",
            request.query,
            tokens.len(),
            adapters.len(),
            fetch_limit
        );

        let outcomes = join_all(
            adapters
                .iter()
                .map(|adapter| self.run_adapter(adapter, &tokens, request, fetch_limit)),
        )
        .await;

        let mut hits = Vec::new();
        let mut failed = Vec::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(adapter_hits) => hits.push(adapter_hits),
                Err(e) => {
                    warn!("Search for {} degraded to zero results: {}", kind, e);
                    failed.push(kind);
                }
            }
        }

        if hits.is_empty() && !failed.is_empty() {
            return Err(EslError::SearchUnavailable {
                message: format!("all {} content sources failed", failed.len()),
            });
        }

        let total: usize = hits.iter().map(|h| h.total).sum();
        let reachable: usize = hits
            .iter()
            .map(|h| h.total.min(self.options.per_entity_cap))
            .sum();

        let merged = self.merge(hits, request);
        let results: Vec<ResultItem> = merged
            .into_iter()
            .skip(window.offset())
            .take(window.limit)
            .collect();

        let took_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "search {:?}: {} results of {} in {:.2}ms",
            request.query,
            results.len(),
            total,
            took_ms
        );

        Ok(SearchResponse {
            success: true,
            mode: request.format,
            query: request.query.clone(),
            filter: request.filter,
            page: window.page,
            limit: window.limit,
            total,
            has_more: window.end() < reachable,
            partial: !failed.is_empty(),
            failed_entities: failed,
            took_ms,
            results,
        })
    }

    async fn run_adapter(
        &self,
        adapter: &EntityAdapter,
        tokens: &[String],
        request: &SearchRequest,
        fetch_limit: usize,
    ) -> (EntityKind, Result<AdapterHits>) {
        let timeout = self.options.adapter_timeout;
        let search = adapter.search(self.store.as_ref(), tokens, &request.levels, fetch_limit);

        let outcome = match tokio::time::timeout(timeout, search).await {
            Ok(result) => result.map_err(|e| EslError::AdapterFailed {
                entity: adapter.kind().to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(EslError::Timeout(timeout)),
        };

        (adapter.kind(), outcome)
    }

    /// Order all hits and render them.
    ///
    /// Adapters only fetch rows that carry text, so every row renders and the
    /// merged list lines up with the per-kind totals.
    fn merge(&self, hits: Vec<AdapterHits>, request: &SearchRequest) -> Vec<ResultItem> {
        let mut rows: Vec<(EntityKind, ContentRow)> = hits
            .into_iter()
            .flat_map(|h| {
                let kind = h.kind;
                h.rows.into_iter().map(move |row| (kind, row))
            })
            .collect();

        rows.sort_by_key(|(kind, row)| (kind.priority(), Reverse(row.created_at), row.id));

        rows.iter()
            .filter_map(|(kind, row)| {
                self.registry
                    .get(*kind)
                    .project(row, request.format, self.options.excerpt_chars)
            })
            .collect()
    }
}
