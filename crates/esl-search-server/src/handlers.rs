//! Request handlers for the search endpoint.

use crate::server::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use esl_search::{EslError, Level, SearchRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw query-string parameters of `GET /api/search`.
///
/// Everything arrives as text so malformed numbers produce a JSON 400 rather
/// than the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "q")]
    pub query: Option<String>,
    pub filter: Option<String>,
    pub level: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub format: Option<String>,
}

impl SearchParams {
    /// Parse into a search request. Page bounds are resolved by the service.
    pub fn into_request(self) -> esl_search::Result<SearchRequest> {
        let query = self.query.ok_or_else(|| EslError::InvalidParams {
            message: "Missing required parameter: query".to_string(),
        })?;

        let mut request = SearchRequest::new(query);

        if let Some(filter) = present(self.filter.as_deref()) {
            request = request.filter(filter.parse()?);
        }
        if let Some(level) = present(self.level.as_deref()) {
            request = request.levels(Level::parse_list(level)?);
        }
        if let Some(page) = present(self.page.as_deref()) {
            request = request.page(parse_number("page", page)?);
        }
        if let Some(limit) = present(self.limit.as_deref()) {
            request = request.limit(parse_number("limit", limit)?);
        }
        if let Some(format) = present(self.format.as_deref()) {
            request = request.format(format.parse()?);
        }

        Ok(request)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(field: &str, value: &str) -> esl_search::Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| EslError::validation(field, format!("'{}' is not an integer", value)))
}

fn error_response(err: &EslError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "success": false,
            "error": err.to_string()
        })),
    )
        .into_response()
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// `GET /api/search`
pub async fn handle_search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return error_response(&EslError::InvalidParams {
                message: rejection.body_text(),
            })
        }
    };

    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected search request: {}", e);
            return error_response(&e);
        }
    };

    match state.service.search(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            if !e.is_client_error() {
                warn!("Search failed for {:?}: {}", request.query, e);
            }
            error_response(&e)
        }
    }
}
