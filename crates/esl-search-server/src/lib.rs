//! ESL Search Server - HTTP endpoint for unified content search.
//!
//! Exposes `GET /api/search` over an [`esl_search::SearchService`]. The binary
//! wires it to a SQLite content store; tests and embedders can pass any
//! [`esl_search::ContentStore`].

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, AppState};
