//! Query key patterns - exact or family matches over cached query keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::key::{join_path, split_path, QueryKey};

/// Prefix marking an exact pattern in its textual form (`=items.byId`)
const EXACT_MARKER: char = '=';

/// How a pattern selects cached keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every key whose path starts with the pattern path
    #[default]
    Prefix,
    /// Only keys whose path equals the pattern path
    Exact,
}

/// Names one or more cached query results
///
/// The executor only passes patterns through to the cache adapter; the
/// `matches` helper is what adapters use to resolve a pattern against keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKeyPattern {
    path: Vec<String>,
    mode: MatchMode,
}

impl QueryKeyPattern {
    /// Creates a pattern matching the whole family under `path`
    pub fn prefix(path: impl AsRef<str>) -> Self {
        Self {
            path: split_path(path.as_ref()),
            mode: MatchMode::Prefix,
        }
    }

    /// Creates a pattern matching only `path` itself
    pub fn exact(path: impl AsRef<str>) -> Self {
        Self {
            path: split_path(path.as_ref()),
            mode: MatchMode::Exact,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_exact(&self) -> bool {
        self.mode == MatchMode::Exact
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns true if the given cached key is selected by this pattern
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self.mode {
            MatchMode::Exact => key.path() == self.path.as_slice(),
            MatchMode::Prefix => key.path().starts_with(&self.path),
        }
    }

    /// Returns true if every key selected by `other` is also selected by `self`
    pub fn covers(&self, other: &QueryKeyPattern) -> bool {
        match (self.mode, other.mode) {
            (MatchMode::Exact, MatchMode::Exact) => self.path == other.path,
            (MatchMode::Exact, MatchMode::Prefix) => false,
            (MatchMode::Prefix, _) => other.path.starts_with(&self.path),
        }
    }

    /// Checks the pattern is well formed: a non-empty path with no empty segments
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("pattern path is empty".to_string());
        }

        if let Some(position) = self.path.iter().position(|s| s.trim().is_empty()) {
            return Err(format!("pattern segment {} is empty", position));
        }

        Ok(())
    }
}

impl fmt::Display for QueryKeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            write!(f, "{}", EXACT_MARKER)?;
        }
        f.write_str(&join_path(&self.path))
    }
}

impl FromStr for QueryKeyPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = match s.strip_prefix(EXACT_MARKER) {
            Some(rest) => Self::exact(rest),
            None => Self::prefix(s),
        };

        pattern.validate()?;
        Ok(pattern)
    }
}

impl From<&str> for QueryKeyPattern {
    fn from(path: &str) -> Self {
        Self::prefix(path)
    }
}

impl From<String> for QueryKeyPattern {
    fn from(path: String) -> Self {
        Self::prefix(path)
    }
}

impl From<&QueryKey> for QueryKeyPattern {
    fn from(key: &QueryKey) -> Self {
        Self {
            path: key.path().to_vec(),
            mode: MatchMode::Exact,
        }
    }
}
