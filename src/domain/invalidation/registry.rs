//! Rule registry - mutation name to invalidation rule

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{
    ConfigurationError, InvalidationRule, InvalidationStrategy, RuleConfig, RuleDefinition, RuleSet,
};

/// Mapping from mutation name to the rule applied when it settles
///
/// Registration is expected during setup; lookups afterwards only take the
/// read lock. Re-registering a name replaces the previous rule.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, Arc<InvalidationRule>>>,
    default_strategy: InvalidationStrategy,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy given to rules registered without one
    pub fn with_default_strategy(mut self, strategy: InvalidationStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn default_strategy(&self) -> InvalidationStrategy {
        self.default_strategy
    }

    /// Registers or replaces the rule for `name`
    pub fn on_mutation(
        &self,
        name: impl Into<String>,
        config: RuleConfig,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        let rule = self.build_rule(&name, config)?;

        debug!(
            mutation = %name,
            strategy = %rule.strategy(),
            invalidate = rule.invalidate().len(),
            refetch = rule.refetch().len(),
            "Registered invalidation rule"
        );

        self.write().insert(name, rule);
        Ok(())
    }

    /// Registers every rule of a template expansion under its relative name
    ///
    /// Nothing is registered if any rule is invalid.
    pub fn register_all(&self, rules: RuleSet) -> Result<(), ConfigurationError> {
        let built = rules
            .into_iter()
            .map(|(name, config)| self.build_named(name, config))
            .collect::<Result<Vec<_>, _>>()?;

        self.insert_all(built);
        Ok(())
    }

    /// Registers a template expansion as `{namespace}.{relative name}`
    ///
    /// Nothing is registered if any rule is invalid.
    pub fn register_namespaced(
        &self,
        namespace: &str,
        rules: RuleSet,
    ) -> Result<(), ConfigurationError> {
        if namespace.trim().is_empty() {
            return self.register_all(rules);
        }

        let built = rules
            .into_iter()
            .map(|(name, config)| self.build_named(format!("{}.{}", namespace, name), config))
            .collect::<Result<Vec<_>, _>>()?;

        self.insert_all(built);
        Ok(())
    }

    /// Registers declarative rules loaded from configuration
    ///
    /// Every definition is validated before any of them is registered, so a
    /// bad entry leaves the registry untouched. A later definition for the
    /// same mutation replaces an earlier one.
    pub fn register_definitions<'a, I>(&self, definitions: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = &'a RuleDefinition>,
    {
        let built = definitions
            .into_iter()
            .map(|definition| {
                let config = definition.to_config()?;
                self.build_named(definition.mutation.clone(), config)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.insert_all(built);
        Ok(())
    }

    /// Current rule for `name`, if any
    pub fn get(&self, name: &str) -> Option<Arc<InvalidationRule>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Removes the rule for `name`, returning it if it was registered
    pub fn remove(&self, name: &str) -> Option<Arc<InvalidationRule>> {
        self.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of every registered rule
    ///
    /// The returned map is a copy; changing it does not affect the registry.
    pub fn get_rules(&self) -> HashMap<String, InvalidationRule> {
        self.read()
            .iter()
            .map(|(name, rule)| (name.clone(), rule.as_ref().clone()))
            .collect()
    }

    fn build_rule(
        &self,
        name: &str,
        config: RuleConfig,
    ) -> Result<Arc<InvalidationRule>, ConfigurationError> {
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyMutationName);
        }

        Ok(Arc::new(config.build(name, self.default_strategy)?))
    }

    fn build_named(
        &self,
        name: String,
        config: RuleConfig,
    ) -> Result<(String, Arc<InvalidationRule>), ConfigurationError> {
        let rule = self.build_rule(&name, config)?;
        Ok((name, rule))
    }

    fn insert_all(&self, built: Vec<(String, Arc<InvalidationRule>)>) {
        debug!(count = built.len(), "Registered invalidation rules");
        self.write().extend(built);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<InvalidationRule>>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<InvalidationRule>>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invalidation::patterns;
    use crate::domain::invalidation::PatternDefinition;
    use crate::domain::query_key::QueryKeyPattern;

    #[test]
    fn test_register_and_get() {
        let registry = RuleRegistry::new();
        registry
            .on_mutation(
                "items.create",
                RuleConfig::new()
                    .invalidate("items")
                    .strategy(InvalidationStrategy::Pessimistic),
            )
            .unwrap();

        let rule = registry.get("items.create").unwrap();
        assert_eq!(rule.invalidate(), &[QueryKeyPattern::prefix("items")]);
        assert_eq!(rule.strategy(), InvalidationStrategy::Pessimistic);
        assert!(registry.contains("items.create"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let registry = RuleRegistry::new();

        assert_eq!(
            registry.on_mutation("", RuleConfig::new()),
            Err(ConfigurationError::EmptyMutationName)
        );
        assert_eq!(
            registry.on_mutation("   ", RuleConfig::new()),
            Err(ConfigurationError::EmptyMutationName)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let registry = RuleRegistry::new();
        registry
            .on_mutation("a", RuleConfig::new().invalidate("first"))
            .unwrap();
        registry
            .on_mutation("b", RuleConfig::new().invalidate("other"))
            .unwrap();
        registry
            .on_mutation(
                "a",
                RuleConfig::new()
                    .refetch("second")
                    .strategy(InvalidationStrategy::Hybrid),
            )
            .unwrap();

        let rules = registry.get_rules();
        assert_eq!(rules.len(), 2);

        let a = &rules["a"];
        assert!(a.invalidate().is_empty());
        assert_eq!(a.refetch(), &[QueryKeyPattern::prefix("second")]);
        assert_eq!(a.strategy(), InvalidationStrategy::Hybrid);
        assert_eq!(rules["b"].invalidate(), &[QueryKeyPattern::prefix("other")]);
    }

    #[test]
    fn test_get_rules_is_a_snapshot() {
        let registry = RuleRegistry::new();
        registry
            .on_mutation("a", RuleConfig::new().invalidate("items"))
            .unwrap();

        let mut snapshot = registry.get_rules();
        snapshot.clear();

        assert_eq!(registry.len(), 1);
        assert!(registry.get_rules().contains_key("a"));
    }

    #[test]
    fn test_default_strategy_applies_when_missing() {
        let registry = RuleRegistry::new().with_default_strategy(InvalidationStrategy::Hybrid);
        registry
            .on_mutation("a", RuleConfig::new().invalidate("items"))
            .unwrap();

        assert_eq!(
            registry.get("a").unwrap().strategy(),
            InvalidationStrategy::Hybrid
        );
    }

    #[test]
    fn test_invalid_pattern_keeps_previous_rule() {
        let registry = RuleRegistry::new();
        registry
            .on_mutation("a", RuleConfig::new().invalidate("items"))
            .unwrap();

        let result = registry.on_mutation("a", RuleConfig::new().invalidate(""));
        assert!(matches!(result, Err(ConfigurationError::InvalidPattern { .. })));
        assert_eq!(
            registry.get("a").unwrap().invalidate(),
            &[QueryKeyPattern::prefix("items")]
        );
    }

    #[test]
    fn test_register_namespaced_template() {
        let registry = RuleRegistry::new();
        registry
            .register_namespaced("items", patterns::crud("items.list", "items.byId", "items.count"))
            .unwrap();

        let mut names: Vec<_> = registry.get_rules().into_keys().collect();
        names.sort();
        assert_eq!(names, vec!["items.create", "items.delete", "items.update"]);
    }

    #[test]
    fn test_register_all_uses_relative_names() {
        let registry = RuleRegistry::new();
        registry
            .register_all(patterns::searchable("searchResults", "items"))
            .unwrap();

        assert!(registry.contains("updateSearchResults"));
    }

    #[test]
    fn test_register_definitions_is_all_or_nothing() {
        let registry = RuleRegistry::new();
        let mut definitions = vec![
            RuleDefinition {
                mutation: "a".to_string(),
                strategy: Some("hybrid".to_string()),
                ..Default::default()
            },
            RuleDefinition {
                mutation: "b".to_string(),
                strategy: Some("sometimes".to_string()),
                ..Default::default()
            },
        ];

        let result = registry.register_definitions(&definitions);
        assert_eq!(
            result,
            Err(ConfigurationError::unknown_strategy("b", "sometimes"))
        );
        assert!(registry.is_empty());

        definitions.pop();
        registry.register_definitions(&definitions).unwrap();
        assert_eq!(
            registry.get("a").unwrap().strategy(),
            InvalidationStrategy::Hybrid
        );
    }

    #[test]
    fn test_register_definitions_keeps_name_case() {
        let registry = RuleRegistry::new();
        let definitions = [RuleDefinition {
            mutation: "items.createChild".to_string(),
            invalidate: vec![PatternDefinition::Text("items.children".to_string())],
            ..Default::default()
        }];

        registry.register_definitions(&definitions).unwrap();

        assert!(registry.contains("items.createChild"));
        assert!(!registry.contains("items.createchild"));
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let registry = RuleRegistry::new();
        let mut rules = patterns::crud("items", "itemById", "itemCount");
        rules.insert("zz.broken".to_string(), RuleConfig::new().invalidate("a..b"));

        let result = registry.register_all(rules);
        assert!(matches!(result, Err(ConfigurationError::InvalidPattern { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_namespaced_is_all_or_nothing() {
        let registry = RuleRegistry::new();
        registry
            .on_mutation("items.create", RuleConfig::new().invalidate("previous"))
            .unwrap();

        let mut rules = patterns::crud("items", "itemById", "itemCount");
        rules.insert("zz".to_string(), RuleConfig::new().refetch(""));

        let result = registry.register_namespaced("items", rules);
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidPattern { list: "refetch", .. })
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("items.create").unwrap().invalidate(),
            &[QueryKeyPattern::prefix("previous")]
        );
    }

    #[test]
    fn test_remove() {
        let registry = RuleRegistry::new();
        registry.on_mutation("a", RuleConfig::none()).unwrap();

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }
}
