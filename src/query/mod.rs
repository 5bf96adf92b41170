//! Cached query layer over the catalog.
//!
//! - `QueryCache`: generic keyed cache with coalescing, staleness and retries
//! - `PolicyTable`: per-family staleness and retry settings
//! - `BookQueries`: the catalog operations exposed to the rest of the crate

mod books;
mod cache;
mod key;
mod policy;

pub use books::{AuthorSet, BookQueries, BookWithAuthors, QueryResult};
pub use cache::{DataSource, QueryCache, QueryData, QueryStatus};
pub use key::QueryKey;
pub use policy::{Backoff, PolicyTable, QueryFamily, QueryPolicy};
