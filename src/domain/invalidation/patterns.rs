//! Pattern library - rule sets for common relationship shapes
//!
//! Templates are pure: they only build values, and identical arguments
//! always yield equal rule sets. Feed the result to
//! `RuleRegistry::register_all` or `RuleRegistry::register_namespaced`.

use std::collections::BTreeMap;

use super::{InvalidationStrategy, RuleConfig};

/// Relative mutation name to rule
pub type RuleSet = BTreeMap<String, RuleConfig>;

/// Create/update/delete over a list, a detail query and a count
///
/// Deletes are pessimistic so a removed entity's cached detail cannot be
/// rendered after the caller proceeds.
pub fn crud(list: &str, find_by_id: &str, count: &str) -> RuleSet {
    let mut rules = RuleSet::new();

    rules.insert(
        "create".to_string(),
        RuleConfig::new()
            .invalidate(list)
            .invalidate(count)
            .strategy(InvalidationStrategy::Optimistic),
    );
    rules.insert(
        "update".to_string(),
        RuleConfig::new()
            .invalidate(list)
            .invalidate(find_by_id)
            .strategy(InvalidationStrategy::Optimistic),
    );
    rules.insert(
        "delete".to_string(),
        RuleConfig::new()
            .invalidate(list)
            .invalidate(count)
            .invalidate(find_by_id)
            .strategy(InvalidationStrategy::Pessimistic),
    );

    rules
}

/// Parent/child collections where parent aggregates depend on children
pub fn hierarchical(parent_list: &str, child_list: &str) -> RuleSet {
    let mut rules = RuleSet::new();

    rules.insert(
        "createChild".to_string(),
        RuleConfig::new()
            .invalidate(parent_list)
            .invalidate(child_list)
            .strategy(InvalidationStrategy::Optimistic),
    );
    rules.insert(
        "updateChild".to_string(),
        RuleConfig::new()
            .invalidate(child_list)
            .strategy(InvalidationStrategy::Optimistic),
    );
    rules.insert(
        "deleteChild".to_string(),
        RuleConfig::new()
            .invalidate(parent_list)
            .invalidate(child_list)
            .strategy(InvalidationStrategy::Pessimistic),
    );

    rules
}

/// Search results that go stale while the backing list must be refreshed now
pub fn searchable(search_name: &str, list_name: &str) -> RuleSet {
    let mut rules = RuleSet::new();

    rules.insert(
        "updateSearchResults".to_string(),
        RuleConfig::new()
            .invalidate(search_name)
            .refetch(list_name)
            .strategy(InvalidationStrategy::Hybrid),
    );

    rules
}

/// Combines rule sets; on a name clash the later set wins
pub fn merge<I>(sets: I) -> RuleSet
where
    I: IntoIterator<Item = RuleSet>,
{
    sets.into_iter().flatten().collect()
}
