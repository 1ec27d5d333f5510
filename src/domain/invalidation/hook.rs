//! Custom side-effect hooks attached to invalidation rules

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::CacheAdapter;
use crate::domain::DomainError;

/// Everything a hook receives about the settled mutation
#[derive(Clone)]
pub struct HookContext {
    pub cache: Arc<dyn CacheAdapter>,
    pub mutation: String,
    pub variables: Value,
    pub data: Option<Value>,
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("mutation", &self.mutation)
            .field("variables", &self.variables)
            .field("data", &self.data)
            .finish()
    }
}

/// Side-effecting hook run after a rule's invalidate and refetch steps
#[async_trait]
pub trait MutationHook: Send + Sync {
    async fn call(&self, ctx: HookContext) -> Result<(), DomainError>;
}

/// Shared hook handle stored in rules
pub type SharedHook = Arc<dyn MutationHook>;

/// Hook backed by a closure
pub struct FnHook<F>(F);

#[async_trait]
impl<F> MutationHook for FnHook<F>
where
    F: Fn(HookContext) -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync,
{
    async fn call(&self, ctx: HookContext) -> Result<(), DomainError> {
        (self.0)(ctx).await
    }
}

/// Wraps a closure returning a boxed future as a shared hook
///
/// ```ignore
/// let hook = hook_fn(|ctx| Box::pin(async move {
///     ctx.cache.refetch(&"items".into()).await
/// }));
/// ```
pub fn hook_fn<F>(f: F) -> SharedHook
where
    F: Fn(HookContext) -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}
