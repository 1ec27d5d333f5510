//! Invalidation domain - rules, registry, templates and the executor

mod adapter;
mod error;
mod executor;
mod hook;
pub mod patterns;
mod registry;
mod rule;
mod strategy;

pub use adapter::CacheAdapter;
pub use error::{ConfigurationError, InvalidationError, InvalidationTarget};
pub use executor::{
    ExecutionReport, InvalidationExecutor, DETACHED_FAILURES_TOTAL, FAILURES_TOTAL, RUNS_TOTAL,
    UNMATCHED_TOTAL,
};
pub use hook::{hook_fn, FnHook, HookContext, MutationHook, SharedHook};
pub use patterns::RuleSet;
pub use registry::RuleRegistry;
pub use rule::{InvalidationRule, PatternDefinition, RuleConfig, RuleDefinition};
pub use strategy::{CallMode, DispatchPlan, InvalidationStrategy};

#[cfg(test)]
pub use adapter::MockCacheAdapter;
