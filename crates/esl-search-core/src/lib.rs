//! ESL Search - Headless library for searching ESL learning content.
//!
//! This crate provides unified search over tests, courses, blogs and the ESL
//! resource types (videos, audios, stories, writings, speakings). It can be
//! used programmatically without any HTTP layer; see `esl-search-server` for
//! the `/api/search` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use esl_search::{SearchRequest, SearchService, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> esl_search::Result<()> {
//!     let store = SqliteStore::open("/path/to/content.db")?;
//!     let service = SearchService::new(Arc::new(store));
//!
//!     let response = service.search(&SearchRequest::new("present perfect")).await?;
//!     println!("Found {} results", response.total);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use config::{SearchConfig, SearchOptions};
pub use error::{EslError, Result};
pub use search::{
    build_any_word_where, tokenize_query, EntityFamily, EntityKind, Level, Predicate,
    ResponseFormat, ResultItem, SearchRequest, SearchResponse, SearchService,
};
pub use store::{ContentRow, ContentStore, MemoryStore, SqliteStore};
