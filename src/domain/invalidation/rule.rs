//! Invalidation rules and their builder/declarative forms

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ConfigurationError, InvalidationStrategy, SharedHook};
use crate::domain::query_key::QueryKeyPattern;

/// Rule as supplied to `RuleRegistry::on_mutation`
///
/// A missing strategy is resolved to the registry's default at registration.
#[derive(Clone, Default)]
pub struct RuleConfig {
    pub invalidate: Vec<QueryKeyPattern>,
    pub refetch: Vec<QueryKeyPattern>,
    pub strategy: Option<InvalidationStrategy>,
    pub custom: Option<SharedHook>,
}

impl RuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule documenting that the mutation has no cache effects
    pub fn none() -> Self {
        Self::new().strategy(InvalidationStrategy::None)
    }

    pub fn invalidate(mut self, pattern: impl Into<QueryKeyPattern>) -> Self {
        self.invalidate.push(pattern.into());
        self
    }

    pub fn refetch(mut self, pattern: impl Into<QueryKeyPattern>) -> Self {
        self.refetch.push(pattern.into());
        self
    }

    pub fn strategy(mut self, strategy: InvalidationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn custom(mut self, hook: SharedHook) -> Self {
        self.custom = Some(hook);
        self
    }

    /// Validates the rule and resolves it into an immutable registry entry
    pub(crate) fn build(
        self,
        mutation: &str,
        default_strategy: InvalidationStrategy,
    ) -> Result<InvalidationRule, ConfigurationError> {
        validate_patterns(mutation, "invalidate", &self.invalidate)?;
        validate_patterns(mutation, "refetch", &self.refetch)?;

        Ok(InvalidationRule {
            invalidate: self.invalidate,
            refetch: self.refetch,
            strategy: self.strategy.unwrap_or(default_strategy),
            custom: self.custom,
        })
    }
}

fn validate_patterns(
    mutation: &str,
    list: &'static str,
    patterns: &[QueryKeyPattern],
) -> Result<(), ConfigurationError> {
    for (index, pattern) in patterns.iter().enumerate() {
        pattern
            .validate()
            .map_err(|reason| ConfigurationError::invalid_pattern(mutation, list, index, reason))?;
    }
    Ok(())
}

fn same_hook(a: &Option<SharedHook>, b: &Option<SharedHook>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for RuleConfig {
    fn eq(&self, other: &Self) -> bool {
        self.invalidate == other.invalidate
            && self.refetch == other.refetch
            && self.strategy == other.strategy
            && same_hook(&self.custom, &other.custom)
    }
}

impl fmt::Debug for RuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleConfig")
            .field("invalidate", &self.invalidate)
            .field("refetch", &self.refetch)
            .field("strategy", &self.strategy)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Registered rule; immutable once built
#[derive(Clone)]
pub struct InvalidationRule {
    invalidate: Vec<QueryKeyPattern>,
    refetch: Vec<QueryKeyPattern>,
    strategy: InvalidationStrategy,
    custom: Option<SharedHook>,
}

impl InvalidationRule {
    pub fn invalidate(&self) -> &[QueryKeyPattern] {
        &self.invalidate
    }

    pub fn refetch(&self) -> &[QueryKeyPattern] {
        &self.refetch
    }

    pub fn strategy(&self) -> InvalidationStrategy {
        self.strategy
    }

    pub fn custom(&self) -> Option<&SharedHook> {
        self.custom.as_ref()
    }

    /// True for a `none` rule without a hook: the mutation has no cache effects
    pub fn is_noop(&self) -> bool {
        self.custom.is_none()
            && (self.strategy == InvalidationStrategy::None
                || (self.invalidate.is_empty() && self.refetch.is_empty()))
    }
}

impl PartialEq for InvalidationRule {
    fn eq(&self, other: &Self) -> bool {
        self.invalidate == other.invalidate
            && self.refetch == other.refetch
            && self.strategy == other.strategy
            && same_hook(&self.custom, &other.custom)
    }
}

impl fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRule")
            .field("invalidate", &self.invalidate)
            .field("refetch", &self.refetch)
            .field("strategy", &self.strategy)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Pattern as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternDefinition {
    /// `"items"` (family) or `"=items.byId"` (exact)
    Text(String),
    /// `{ key = "items.byId", exact = true }`
    Detailed {
        key: String,
        #[serde(default)]
        exact: bool,
    },
}

impl PatternDefinition {
    fn to_pattern(&self) -> QueryKeyPattern {
        match self {
            Self::Text(text) => match text.strip_prefix('=') {
                Some(rest) => QueryKeyPattern::exact(rest),
                None => QueryKeyPattern::prefix(text),
            },
            Self::Detailed { key, exact: true } => QueryKeyPattern::exact(key),
            Self::Detailed { key, exact: false } => QueryKeyPattern::prefix(key),
        }
    }
}

/// Declarative, string-typed rule loaded from configuration
///
/// The mutation name is a value rather than a table key so it keeps its case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub mutation: String,
    #[serde(default)]
    pub invalidate: Vec<PatternDefinition>,
    #[serde(default)]
    pub refetch: Vec<PatternDefinition>,
    #[serde(default)]
    pub strategy: Option<String>,
}

impl RuleDefinition {
    /// Converts into a rule config, rejecting unknown strategy names
    pub fn to_config(&self) -> Result<RuleConfig, ConfigurationError> {
        let mutation = self.mutation.as_str();
        let strategy = self
            .strategy
            .as_deref()
            .map(|value| {
                value
                    .parse::<InvalidationStrategy>()
                    .map_err(|_| ConfigurationError::unknown_strategy(mutation, value))
            })
            .transpose()?;

        Ok(RuleConfig {
            invalidate: self.invalidate.iter().map(PatternDefinition::to_pattern).collect(),
            refetch: self.refetch.iter().map(PatternDefinition::to_pattern).collect(),
            strategy,
            custom: None,
        })
    }
}
