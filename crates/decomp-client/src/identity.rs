use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use decomp_core::errors::RemoteError;
use decomp_core::identity::{Identity, IdentityProvider};

struct CacheCell {
    value: Identity,
    fetched_at: Instant,
}

/// Caches the current actor behind an explicit `(value, fetched_at, ttl)`
/// cell. The cache is owned here, not ambient static state, so the engine
/// stays testable against any provider.
pub struct CachedIdentityProvider<P> {
    inner: P,
    ttl: Duration,
    cache: RwLock<Option<CacheCell>>,
}

impl<P> CachedIdentityProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<P: IdentityProvider> IdentityProvider for CachedIdentityProvider<P> {
    async fn current_actor(&self) -> Result<Identity, RemoteError> {
        {
            let cache = self.cache.read().await;
            if let Some(cell) = cache.as_ref() {
                if cell.fetched_at.elapsed() < self.ttl {
                    return Ok(cell.value.clone());
                }
            }
        }

        debug!("identity cache cold, fetching current actor");
        let value = self.inner.current_actor().await?;
        *self.cache.write().await = Some(CacheCell {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn current_actor(&self) -> Result<Identity, RemoteError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(Identity::new("Actor", "actor@x"))
        }
    }

    #[tokio::test]
    async fn second_call_within_ttl_hits_the_cache() {
        let provider = CachedIdentityProvider::new(CountingProvider::new(), Duration::from_secs(300));
        provider.current_actor().await.unwrap();
        provider.current_actor().await.unwrap();
        assert_eq!(provider.inner.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_refetches() {
        let provider = CachedIdentityProvider::new(CountingProvider::new(), Duration::ZERO);
        provider.current_actor().await.unwrap();
        provider.current_actor().await.unwrap();
        assert_eq!(provider.inner.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        struct FlakyProvider {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl IdentityProvider for FlakyProvider {
            async fn current_actor(&self) -> Result<Identity, RemoteError> {
                if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
                    Err(RemoteError::NetworkError("tcp reset".into()))
                } else {
                    Ok(Identity::new("Actor", "actor@x"))
                }
            }
        }

        let provider = CachedIdentityProvider::new(
            FlakyProvider {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(300),
        );
        assert!(provider.current_actor().await.is_err());
        assert!(provider.current_actor().await.is_ok());
    }
}
