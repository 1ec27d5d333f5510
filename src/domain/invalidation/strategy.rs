//! Invalidation strategies and the dispatch plan each one implies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Timing, blocking and error-propagation policy of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationStrategy {
    /// Everything runs in the background; failures are only logged
    #[default]
    Optimistic,
    /// Everything is awaited; the first failure is returned to the caller
    Pessimistic,
    /// Invalidations run in the background, refetches and the hook are awaited
    Hybrid,
    /// No cache calls; only the custom hook runs
    None,
}

impl InvalidationStrategy {
    pub const ALL: [InvalidationStrategy; 4] = [
        Self::Optimistic,
        Self::Pessimistic,
        Self::Hybrid,
        Self::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Pessimistic => "pessimistic",
            Self::Hybrid => "hybrid",
            Self::None => "none",
        }
    }

    /// How each step of a rule is driven under this strategy
    pub fn plan(&self) -> DispatchPlan {
        use CallMode::{Awaited, Detached, Skipped};

        match self {
            Self::Optimistic => DispatchPlan::new(Detached, Detached, Detached),
            Self::Pessimistic => DispatchPlan::new(Awaited, Awaited, Awaited),
            Self::Hybrid => DispatchPlan::new(Detached, Awaited, Awaited),
            Self::None => DispatchPlan::new(Skipped, Skipped, Awaited),
        }
    }
}

impl fmt::Display for InvalidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "pessimistic" => Ok(Self::Pessimistic),
            "hybrid" => Ok(Self::Hybrid),
            "none" => Ok(Self::None),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// How a single adapter call or hook invocation is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Awaited by the executor; failures surface to the caller
    Awaited,
    /// Dispatched and left running; failures are logged and counted
    Detached,
    /// Not invoked at all
    Skipped,
}

impl CallMode {
    pub fn is_awaited(&self) -> bool {
        matches!(self, Self::Awaited)
    }
}

/// Per-step call modes derived from a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub invalidate: CallMode,
    pub refetch: CallMode,
    pub hook: CallMode,
}

impl DispatchPlan {
    const fn new(invalidate: CallMode, refetch: CallMode, hook: CallMode) -> Self {
        Self {
            invalidate,
            refetch,
            hook,
        }
    }
}
