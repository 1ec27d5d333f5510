//! Domain layer - Query keys, invalidation rules and their execution

pub mod error;
pub mod invalidation;
pub mod query_key;

pub use error::DomainError;
pub use invalidation::{
    hook_fn, patterns, CacheAdapter, ConfigurationError, ExecutionReport, HookContext,
    InvalidationError, InvalidationExecutor, InvalidationRule, InvalidationStrategy,
    InvalidationTarget, MutationHook, RuleConfig, RuleDefinition, RuleRegistry, RuleSet,
};
pub use query_key::{MatchMode, QueryKey, QueryKeyPattern};
