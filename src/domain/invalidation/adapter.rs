//! Cache adapter trait - the query cache as seen by the executor

use async_trait::async_trait;

use crate::domain::query_key::QueryKeyPattern;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Query cache operations driven by invalidation rules
///
/// Both operations must be idempotent and must succeed when the pattern
/// matches nothing; the executor never deduplicates calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Marks every entry matched by the pattern as stale
    async fn invalidate(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError>;

    /// Forces an immediate refresh of every entry matched by the pattern
    async fn refetch(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A call observed by the recording adapter
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum AdapterCall {
        Invalidate(String),
        Refetch(String),
        InvalidateDone(String),
        RefetchDone(String),
    }

    /// Adapter that records every call in order, with optional failures and delays
    #[derive(Debug, Default)]
    pub struct RecordingCacheAdapter {
        calls: Mutex<Vec<AdapterCall>>,
        failures: Mutex<HashMap<String, String>>,
        delays: Mutex<HashMap<String, Duration>>,
    }

    impl RecordingCacheAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every call against `pattern` fail with the given message
        pub fn with_failure(self, pattern: &str, message: impl Into<String>) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(pattern.to_string(), message.into());
            self
        }

        /// Makes every call against `pattern` sleep before completing
        pub fn with_delay(self, pattern: &str, delay: Duration) -> Self {
            self.delays
                .lock()
                .unwrap()
                .insert(pattern.to_string(), delay);
            self
        }

        pub fn calls(&self) -> Vec<AdapterCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls made, without the completion markers
        pub fn dispatched(&self) -> Vec<AdapterCall> {
            self.calls()
                .into_iter()
                .filter(|c| matches!(c, AdapterCall::Invalidate(_) | AdapterCall::Refetch(_)))
                .collect()
        }

        async fn record(
            &self,
            start: AdapterCall,
            done: AdapterCall,
            pattern: &QueryKeyPattern,
        ) -> Result<(), DomainError> {
            let key = pattern.to_string();
            self.calls.lock().unwrap().push(start);

            let delay = self.delays.lock().unwrap().get(&key).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let failure = self.failures.lock().unwrap().get(&key).cloned();
            if let Some(message) = failure {
                return Err(DomainError::cache(message));
            }

            self.calls.lock().unwrap().push(done);
            Ok(())
        }
    }

    #[async_trait]
    impl CacheAdapter for RecordingCacheAdapter {
        async fn invalidate(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError> {
            let key = pattern.to_string();
            self.record(
                AdapterCall::Invalidate(key.clone()),
                AdapterCall::InvalidateDone(key),
                pattern,
            )
            .await
        }

        async fn refetch(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError> {
            let key = pattern.to_string();
            self.record(
                AdapterCall::Refetch(key.clone()),
                AdapterCall::RefetchDone(key),
                pattern,
            )
            .await
        }
    }
}
