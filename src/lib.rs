//! Mutation Invalidation
//!
//! Keeps a client-side query cache consistent after RPC mutations settle:
//! - Rule registry mapping mutation names to invalidation rules
//! - Pattern library for CRUD, hierarchical and searchable relationships
//! - Executor applying optimistic, pessimistic, hybrid or hook-only strategies
//! - In-memory query cache adapter built on moka

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    hook_fn, patterns, CacheAdapter, ConfigurationError, DomainError, ExecutionReport,
    HookContext, InvalidationError, InvalidationExecutor, InvalidationRule, InvalidationStrategy,
    InvalidationTarget, MatchMode, MutationHook, QueryKey, QueryKeyPattern, RuleConfig,
    RuleDefinition, RuleRegistry, RuleSet,
};
pub use infrastructure::{InMemoryQueryCache, InMemoryQueryCacheConfig};
