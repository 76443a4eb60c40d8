//! Centralized configuration for the search core.
//!
//! Compile-time defaults live in the `*Config` constant structs. Runtime
//! overrides (CLI flags, tests) go through [`SearchOptions`].

use crate::error::{EslError, Result};
use std::time::Duration;

/// Search and pagination defaults.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_PAGE: usize = 1;
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;
    /// Upper bound on rows fetched from a single entity table per request.
    pub const PER_ENTITY_CAP: usize = 500;
    pub const ADAPTER_TIMEOUT: Duration = Duration::from_millis(2000);
    /// Characters kept when an excerpt is cut from longer text.
    pub const EXCERPT_CHARS: usize = 200;
}

/// SQLite connection settings.
pub struct DatabaseConfig;

impl DatabaseConfig {
    pub const BUSY_TIMEOUT_MS: u32 = 5000;
    pub const READ_POOL_SIZE: usize = 4;
    pub const PRAGMAS: &'static str = "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA temp_store=MEMORY;
    ";
}

/// Runtime search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub default_limit: usize,
    pub max_limit: usize,
    pub per_entity_cap: usize,
    pub adapter_timeout: Duration,
    pub excerpt_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            default_limit: SearchConfig::DEFAULT_LIMIT,
            max_limit: SearchConfig::MAX_LIMIT,
            per_entity_cap: SearchConfig::PER_ENTITY_CAP,
            adapter_timeout: SearchConfig::ADAPTER_TIMEOUT,
            excerpt_chars: SearchConfig::EXCERPT_CHARS,
        }
    }
}

impl SearchOptions {
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn with_per_entity_cap(mut self, cap: usize) -> Self {
        self.per_entity_cap = cap;
        self
    }

    /// Reject option combinations that cannot produce a usable page.
    pub fn validate(&self) -> Result<()> {
        if self.max_limit == 0 || self.default_limit == 0 {
            return Err(EslError::Config {
                message: "page size limits must be positive".to_string(),
            });
        }
        if self.default_limit > self.max_limit {
            return Err(EslError::Config {
                message: format!(
                    "default limit {} exceeds max limit {}",
                    self.default_limit, self.max_limit
                ),
            });
        }
        if self.per_entity_cap < self.max_limit {
            return Err(EslError::Config {
                message: format!(
                    "per-entity cap {} is smaller than max limit {}",
                    self.per_entity_cap, self.max_limit
                ),
            });
        }
        if self.adapter_timeout.is_zero() {
            return Err(EslError::Config {
                message: "adapter timeout must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
