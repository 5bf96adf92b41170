//! Per-family cache policies.
//!
//! | family             | stale after | retries | backoff cap |
//! |--------------------|-------------|---------|-------------|
//! | `search`           | 5 min       | 2       | 5 s         |
//! | everything else    | 30 min      | 3       | 30 s        |
//!
//! The delay before retry `n` (0-based) is `min(base * 2^n, cap)`, base 1 s.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{PolicyOverride, QueryConfig};

/// Operation family sharing one cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFamily {
    Search,
    BookDetails,
    Trending,
    Classics,
    Subject,
    AuthorBooks,
    AuthorDetails,
    AllAuthors,
    BookWithAuthors,
}

impl QueryFamily {
    pub const ALL: [QueryFamily; 9] = [
        QueryFamily::Search,
        QueryFamily::BookDetails,
        QueryFamily::Trending,
        QueryFamily::Classics,
        QueryFamily::Subject,
        QueryFamily::AuthorBooks,
        QueryFamily::AuthorDetails,
        QueryFamily::AllAuthors,
        QueryFamily::BookWithAuthors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryFamily::Search => "search",
            QueryFamily::BookDetails => "book_details",
            QueryFamily::Trending => "trending",
            QueryFamily::Classics => "classics",
            QueryFamily::Subject => "subject",
            QueryFamily::AuthorBooks => "author_books",
            QueryFamily::AuthorDetails => "author_details",
            QueryFamily::AllAuthors => "all_authors",
            QueryFamily::BookWithAuthors => "book_with_authors",
        }
    }
}

impl fmt::Display for QueryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.cap)
    }
}

/// Caching and retry behaviour of one query family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Age after which a cached value is refreshed on next access
    pub stale_time: Duration,
    /// Time without access after which a cached entry is dropped
    pub gc_time: Duration,
    /// Automatic retries after the first failed attempt
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl QueryPolicy {
    /// Policy for free-text search, which changes as the user types.
    pub fn short_lived() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            max_retries: 2,
            backoff: Backoff {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(5),
            },
        }
    }

    /// Policy for catalog records that rarely change.
    pub fn long_lived() -> Self {
        Self {
            stale_time: Duration::from_secs(30 * 60),
            gc_time: Duration::from_secs(60 * 60),
            max_retries: 3,
            backoff: Backoff {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(30),
            },
        }
    }

    pub fn default_for(family: QueryFamily) -> Self {
        match family {
            QueryFamily::Search => Self::short_lived(),
            _ => Self::long_lived(),
        }
    }

    fn with_override(mut self, o: &PolicyOverride) -> Self {
        if let Some(secs) = o.stale_secs {
            self.stale_time = Duration::from_secs(secs);
        }
        if let Some(secs) = o.gc_secs {
            self.gc_time = Duration::from_secs(secs);
        }
        if let Some(retries) = o.max_retries {
            self.max_retries = retries;
        }
        if let Some(ms) = o.backoff_base_ms {
            self.backoff.base = Duration::from_millis(ms);
        }
        if let Some(ms) = o.backoff_cap_ms {
            self.backoff.cap = Duration::from_millis(ms);
        }
        self
    }
}

/// Mapping from query family to policy.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<QueryFamily, QueryPolicy>,
}

impl PolicyTable {
    /// Build the table from defaults plus configured overrides.
    pub fn from_config(config: &QueryConfig) -> Self {
        let policies = QueryFamily::ALL
            .into_iter()
            .map(|family| {
                let policy = QueryPolicy::default_for(family);
                let policy = match config.policies.get(&family) {
                    Some(o) => policy.with_override(o),
                    None => policy,
                };
                (family, policy)
            })
            .collect();
        Self { policies }
    }

    pub fn get(&self, family: QueryFamily) -> QueryPolicy {
        self.policies
            .get(&family)
            .copied()
            .unwrap_or_else(|| QueryPolicy::default_for(family))
    }

    pub fn set(&mut self, family: QueryFamily, policy: QueryPolicy) {
        self.policies.insert(family, policy);
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}
