//! Query cache infrastructure - Cache adapter implementations

mod in_memory;

pub use in_memory::{CachedQuery, InMemoryQueryCache, InMemoryQueryCacheConfig, QueryFetcher};
