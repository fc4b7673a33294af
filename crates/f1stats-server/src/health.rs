//! Startup probe for the cache store.

use std::time::Duration;

use anyhow::{anyhow, Result};
use f1stats_core::CacheManager;
use tracing::{info, warn};

/// Pings before giving up on the cache at startup
pub const STARTUP_PROBE_ATTEMPTS: u32 = 10;

/// Pause between startup pings
pub const STARTUP_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Ping the cache until it answers or `attempts` pings have failed.
pub async fn wait_for_cache(cache: &CacheManager, attempts: u32, interval: Duration) -> Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match cache.ping().await {
            Ok(()) => {
                info!(attempt, "Cache reachable");
                return Ok(());
            }
            Err(e) if attempt >= attempts => {
                return Err(anyhow!(e).context(format!(
                    "Cache still unreachable after {} attempts",
                    attempts
                )));
            }
            Err(e) => {
                warn!(attempt, error = %e, "Cache not reachable yet, retrying");
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use f1stats_core::{CacheError, KvStore, MemoryStore};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Store whose pings fail until `healthy_after` have been made.
    struct WakingStore {
        inner: MemoryStore,
        pings: AtomicU32,
        healthy_after: u32,
    }

    impl WakingStore {
        fn new(healthy_after: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                pings: AtomicU32::new(0),
                healthy_after,
            }
        }
    }

    #[async_trait]
    impl KvStore for WakingStore {
        async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
            self.inner.keys(prefix).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
            self.inner.delete(keys).await
        }

        async fn flush_all(&self) -> Result<(), CacheError> {
            self.inner.flush_all().await
        }

        async fn ping(&self) -> Result<(), CacheError> {
            let made = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
            if made > self.healthy_after {
                Ok(())
            } else {
                Err(CacheError::Unavailable("connection refused".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_recovers_within_attempts() {
        let store = Arc::new(WakingStore::new(2));
        let cache = CacheManager::new(store.clone(), "test");

        wait_for_cache(&cache, 5, Duration::from_millis(1)).await.unwrap();
        assert_eq!(store.pings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let store = Arc::new(WakingStore::new(u32::MAX));
        let cache = CacheManager::new(store.clone(), "test");

        let err = wait_for_cache(&cache, 3, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(store.pings.load(Ordering::SeqCst), 3);
    }
}
