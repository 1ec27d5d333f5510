//! Invalidation error types

use std::fmt;

use thiserror::Error;

use crate::domain::query_key::QueryKeyPattern;
use crate::domain::DomainError;

/// Malformed rule detected at registration time
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Mutation name must not be empty")]
    EmptyMutationName,

    #[error("Unknown invalidation strategy '{value}' for mutation '{mutation}'")]
    UnknownStrategy { mutation: String, value: String },

    #[error("Invalid pattern in {list}[{index}] for mutation '{mutation}': {reason}")]
    InvalidPattern {
        mutation: String,
        list: &'static str,
        index: usize,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn unknown_strategy(mutation: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownStrategy {
            mutation: mutation.into(),
            value: value.into(),
        }
    }

    pub fn invalid_pattern(
        mutation: impl Into<String>,
        list: &'static str,
        index: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            mutation: mutation.into(),
            list,
            index,
            reason: reason.into(),
        }
    }
}

impl From<ConfigurationError> for DomainError {
    fn from(error: ConfigurationError) -> Self {
        DomainError::configuration(error.to_string())
    }
}

/// The step of a rule that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    Invalidate(QueryKeyPattern),
    Refetch(QueryKeyPattern),
    Hook,
}

impl InvalidationTarget {
    /// Short label used in logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invalidate(_) => "invalidate",
            Self::Refetch(_) => "refetch",
            Self::Hook => "hook",
        }
    }

    pub fn pattern(&self) -> Option<&QueryKeyPattern> {
        match self {
            Self::Invalidate(pattern) | Self::Refetch(pattern) => Some(pattern),
            Self::Hook => None,
        }
    }
}

impl fmt::Display for InvalidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalidate(pattern) => write!(f, "invalidate({})", pattern),
            Self::Refetch(pattern) => write!(f, "refetch({})", pattern),
            Self::Hook => f.write_str("custom hook"),
        }
    }
}

/// An awaited adapter call or custom hook failed
#[derive(Debug, Clone, Error)]
#[error("Invalidation for mutation '{mutation}' failed at {target}: {source}")]
pub struct InvalidationError {
    pub mutation: String,
    pub target: InvalidationTarget,
    #[source]
    pub source: DomainError,
}

impl InvalidationError {
    pub fn new(mutation: impl Into<String>, target: InvalidationTarget, source: DomainError) -> Self {
        Self {
            mutation: mutation.into(),
            target,
            source,
        }
    }
}
