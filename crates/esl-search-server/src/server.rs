//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_search};
use axum::{routing::get, Router};
use esl_search::SearchService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Requests served at once before new ones queue.
const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Application state shared across handlers.
pub struct AppState {
    /// Cross-entity search service
    pub service: SearchService,
}

/// Build the router with all routes and middleware.
pub fn build_router(service: SearchService) -> Router {
    let state = Arc::new(AppState { service });

    // Search is public and read-only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", get(handle_search))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the search HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    service: SearchService,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(service);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esl_search::MemoryStore;

    #[tokio::test]
    async fn test_server_starts() {
        let service = SearchService::new(Arc::new(MemoryStore::new()));
        let addr = start_server(service, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_invalid_host_rejected() {
        let service = SearchService::new(Arc::new(MemoryStore::new()));
        assert!(start_server(service, "not a host", 0).await.is_err());
    }
}
