//! Query key - identity of one cached read result

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between the segments of a procedure path (e.g. `items.byId`)
pub const PATH_SEPARATOR: &str = ".";

/// Identifies a single cached query result: the procedure path plus its input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    path: Vec<String>,
    input: Option<String>,
}

impl QueryKey {
    /// Creates a key from a dotted procedure path with no input
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: split_path(path.as_ref()),
            input: None,
        }
    }

    /// Creates a key from already split path segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: segments.into_iter().map(Into::into).collect(),
            input: None,
        }
    }

    /// Attaches the query input. The input is stored in canonical JSON form
    /// so keys built from equal values hash identically.
    pub fn with_input(mut self, input: &Value) -> Self {
        self.input = Some(input.to_string());
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the query input, if one was attached
    pub fn input(&self) -> Option<Value> {
        self.input
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Returns the dotted procedure path
    pub fn procedure(&self) -> String {
        join_path(&self.path)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "{}({})", self.procedure(), input),
            None => f.write_str(&self.procedure()),
        }
    }
}

pub(crate) fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }

    path.split(PATH_SEPARATOR).map(str::to_string).collect()
}

pub(crate) fn join_path(segments: &[String]) -> String {
    segments.join(PATH_SEPARATOR)
}
