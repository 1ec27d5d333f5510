//! Query keys and the patterns that select them

mod key;
mod pattern;

pub use key::{QueryKey, PATH_SEPARATOR};
pub use pattern::{MatchMode, QueryKeyPattern};
