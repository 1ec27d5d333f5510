//! Infrastructure layer - Cache adapters, logging and metrics

pub mod logging;
pub mod observability;
pub mod query_cache;

pub use logging::init_logging;
pub use observability::describe_metrics;
pub use query_cache::{CachedQuery, InMemoryQueryCache, InMemoryQueryCacheConfig, QueryFetcher};
