//! Unified search across ESL content types.
//!
//! Free text is tokenized into lowercase words, turned into an any-word
//! predicate per entity kind, and fanned out to one adapter per kind. The
//! service merges the hits into a single ordered, paginated list.

pub mod adapter;
pub mod entity;
pub mod predicate;
mod service;
pub mod tokenizer;
pub mod types;

pub use adapter::{AdapterRegistry, EntityAdapter};
pub use entity::{EntityFamily, EntityKind, Level};
pub use predicate::{build_any_word_where, Predicate};
pub use service::SearchService;
pub use tokenizer::tokenize_query;
pub use types::{PageWindow, ResponseFormat, ResultItem, SearchRequest, SearchResponse};
