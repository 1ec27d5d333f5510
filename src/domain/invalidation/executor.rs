//! Invalidation executor - drives the cache adapter for a settled mutation

use std::future::Future;
use std::sync::Arc;
use std::task::Poll;

use metrics::counter;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, error, info_span, warn, Instrument};

use super::{
    CacheAdapter, CallMode, HookContext, InvalidationError, InvalidationRule, InvalidationStrategy,
    InvalidationTarget, RuleRegistry,
};
use crate::domain::DomainError;

pub const RUNS_TOTAL: &str = "invalidation_runs_total";
pub const UNMATCHED_TOTAL: &str = "invalidation_unmatched_total";
pub const FAILURES_TOTAL: &str = "invalidation_failures_total";
pub const DETACHED_FAILURES_TOTAL: &str = "invalidation_detached_failures_total";

/// Outcome of a successful executor run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Mutation that settled
    pub mutation: String,
    /// Strategy of the matched rule; `None` when no rule is registered
    pub strategy: Option<InvalidationStrategy>,
    /// Adapter calls and hook invocations started
    pub dispatched: usize,
    /// Of those, how many were awaited before returning
    pub awaited: usize,
}

impl ExecutionReport {
    fn unmatched(mutation: &str) -> Self {
        Self {
            mutation: mutation.to_string(),
            strategy: None,
            dispatched: 0,
            awaited: 0,
        }
    }

    pub fn matched(&self) -> bool {
        self.strategy.is_some()
    }
}

/// Applies registered rules after mutations complete
///
/// Rule steps run in order: every `invalidate` pattern, then every `refetch`
/// pattern, then the custom hook. Each call is dispatched in that order;
/// detached calls are started in place and left running in the background.
/// Awaited calls are awaited one at a time, and the first failure among them
/// is returned after the remaining steps have run.
#[derive(Debug, Clone)]
pub struct InvalidationExecutor {
    registry: Arc<RuleRegistry>,
    log_unmatched: bool,
}

impl InvalidationExecutor {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            log_unmatched: false,
        }
    }

    /// Logs mutations that settle without a registered rule
    pub fn with_log_unmatched(mut self, enabled: bool) -> Self {
        self.log_unmatched = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Runs the rule registered for `mutation`, if any
    ///
    /// Returns once every awaited step has finished. Only awaited steps can
    /// fail the call; a missing rule is a successful no-op.
    pub async fn invalidate(
        &self,
        cache: Arc<dyn CacheAdapter>,
        mutation: &str,
        variables: Value,
        data: Option<Value>,
    ) -> Result<ExecutionReport, InvalidationError> {
        let Some(rule) = self.registry.get(mutation) else {
            counter!(UNMATCHED_TOTAL).increment(1);

            if self.log_unmatched {
                debug!(mutation = %mutation, "No invalidation rule registered");
            }

            return Ok(ExecutionReport::unmatched(mutation));
        };

        let strategy = rule.strategy();
        counter!(RUNS_TOTAL, "strategy" => strategy.as_str()).increment(1);

        let span = info_span!("invalidation", mutation = %mutation, strategy = %strategy);

        run_rule(&rule, cache, mutation, variables, data)
            .instrument(span)
            .await
    }
}

async fn run_rule(
    rule: &InvalidationRule,
    cache: Arc<dyn CacheAdapter>,
    mutation: &str,
    variables: Value,
    data: Option<Value>,
) -> Result<ExecutionReport, InvalidationError> {
    let plan = rule.strategy().plan();
    let mut run = Run::new(mutation, rule.strategy());

    for pattern in rule.invalidate() {
        let cache = cache.clone();
        let target_pattern = pattern.clone();

        run.call(
            plan.invalidate,
            InvalidationTarget::Invalidate(pattern.clone()),
            async move { cache.invalidate(&target_pattern).await },
        )
        .await;
    }

    for pattern in rule.refetch() {
        let cache = cache.clone();
        let target_pattern = pattern.clone();

        run.call(
            plan.refetch,
            InvalidationTarget::Refetch(pattern.clone()),
            async move { cache.refetch(&target_pattern).await },
        )
        .await;
    }

    if let Some(hook) = rule.custom() {
        let hook = hook.clone();
        let ctx = HookContext {
            cache,
            mutation: mutation.to_string(),
            variables,
            data,
        };

        run.call(plan.hook, InvalidationTarget::Hook, async move {
            hook.call(ctx).await
        })
        .await;
    }

    run.finish()
}

/// Bookkeeping for one executor run
struct Run {
    mutation: String,
    strategy: InvalidationStrategy,
    dispatched: usize,
    awaited: usize,
    first_error: Option<InvalidationError>,
}

impl Run {
    fn new(mutation: &str, strategy: InvalidationStrategy) -> Self {
        Self {
            mutation: mutation.to_string(),
            strategy,
            dispatched: 0,
            awaited: 0,
            first_error: None,
        }
    }

    /// Drives one adapter call or hook according to its call mode
    async fn call<F>(&mut self, mode: CallMode, target: InvalidationTarget, call: F)
    where
        F: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        match mode {
            CallMode::Skipped => {}
            CallMode::Awaited => {
                self.dispatched += 1;
                self.awaited += 1;

                debug!(step = %target, "Awaiting invalidation step");

                if let Err(e) = call.await {
                    self.record_failure(target, e);
                }
            }
            CallMode::Detached => {
                self.dispatched += 1;

                debug!(step = %target, "Dispatching invalidation step");

                detach(self.mutation.clone(), target, call).await;
            }
        }
    }

    fn record_failure(&mut self, target: InvalidationTarget, source: DomainError) {
        error!(
            mutation = %self.mutation,
            step = %target,
            error = %source,
            "Invalidation step failed"
        );
        counter!(
            FAILURES_TOTAL,
            "mutation" => self.mutation.clone(),
            "target" => target.kind()
        )
        .increment(1);

        if self.first_error.is_none() {
            self.first_error = Some(InvalidationError::new(&self.mutation, target, source));
        }
    }

    fn finish(self) -> Result<ExecutionReport, InvalidationError> {
        if let Some(error) = self.first_error {
            return Err(error);
        }

        debug!(
            dispatched = self.dispatched,
            awaited = self.awaited,
            "Invalidation complete"
        );

        Ok(ExecutionReport {
            mutation: self.mutation,
            strategy: Some(self.strategy),
            dispatched: self.dispatched,
            awaited: self.awaited,
        })
    }
}

/// Starts a call in place and hands whatever is left of it to the runtime
///
/// Polling once before spawning keeps dispatch order equal to rule order.
/// Without a tokio runtime the call is finished in place instead.
async fn detach<F>(mutation: String, target: InvalidationTarget, call: F)
where
    F: Future<Output = Result<(), DomainError>> + Send + 'static,
{
    let mut call = Box::pin(call);

    let first_poll = futures::poll!(call.as_mut());

    match first_poll {
        Poll::Ready(result) => report_detached(&mutation, &target, result),
        Poll::Pending => match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(
                    async move {
                        let result = call.await;
                        report_detached(&mutation, &target, result);
                    }
                    .in_current_span(),
                );
            }
            Err(_) => {
                debug!(step = %target, "No tokio runtime, finishing background step in place");

                let result = call.await;
                report_detached(&mutation, &target, result);
            }
        },
    }
}

fn report_detached(mutation: &str, target: &InvalidationTarget, result: Result<(), DomainError>) {
    if let Err(e) = result {
        warn!(
            mutation = %mutation,
            step = %target,
            error = %e,
            "Background invalidation step failed"
        );
        counter!(
            DETACHED_FAILURES_TOTAL,
            "mutation" => mutation.to_string(),
            "target" => target.kind()
        )
        .increment(1);
    }
}
