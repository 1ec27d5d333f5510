use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{ConfigurationError, InvalidationExecutor, InvalidationStrategy, RuleDefinition, RuleRegistry};
use crate::infrastructure::query_cache::InMemoryQueryCacheConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub cache: InMemoryQueryCacheConfig,
    /// Declarative rules, one `[[rules]]` entry per mutation
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Strategy for rules registered without one
    #[serde(default)]
    pub default_strategy: InvalidationStrategy,
    /// Log mutations that settle without a registered rule
    #[serde(default)]
    pub log_unmatched: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_strategy: InvalidationStrategy::Optimistic,
            log_unmatched: false,
        }
    }
}

impl AppConfig {
    /// Loads `config/default`, `config/local` and `INVALIDATION__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("INVALIDATION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from an embedded TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Builds a registry holding every configured rule
    pub fn build_registry(&self) -> Result<RuleRegistry, ConfigurationError> {
        let registry = RuleRegistry::new().with_default_strategy(self.executor.default_strategy);
        registry.register_definitions(&self.rules)?;
        Ok(registry)
    }

    /// Builds an executor over the configured rules
    pub fn build_executor(&self) -> Result<InvalidationExecutor, ConfigurationError> {
        let registry = self.build_registry()?;

        Ok(InvalidationExecutor::new(Arc::new(registry))
            .with_log_unmatched(self.executor.log_unmatched))
    }
}
