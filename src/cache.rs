//! Keyed client/credential caching layer.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

use crate::Result;

/// Process-wide idempotent get-or-create store.
///
/// Keys are hashes of the authentication method in use (one resolved client
/// per distinct account/token hash). Concurrent lookups for the same key run
/// the expensive factory at most once: each key owns a `OnceCell`, and the
/// map lock is only held while locating the cell, never across the factory.
/// A failed factory leaves the cell empty so a later attempt may retry.
pub struct ClientCache<T> {
    entries: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone + Send + Sync> Default for ClientCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ClientCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync> ClientCache<T> {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Hash identifying an authentication method: SHA-256 over the
    /// discriminating parts, hex-encoded.
    pub fn method_key(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Return the cached value for `key`, creating it with `init` on first
    /// use.
    pub async fn get_or_try_create<F, Fut>(&self, key: &str, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(init).await.cloned()
    }

    /// Drop the cached value for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_factory_runs_once_per_key() {
        let cache = ClientCache::new();
        let calls = AtomicUsize::new(0);

        let first: String = cache
            .get_or_try_create("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("client".to_string())
            })
            .await
            .unwrap();
        let second: String = cache
            .get_or_try_create("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("other".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first, "client");
        assert_eq!(second, "client");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_resolution() {
        let cache = Arc::new(ClientCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_try_create("shared", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(42u64)
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_factory_retries() {
        let cache = ClientCache::new();
        let calls = AtomicUsize::new(0);

        let result: Result<u32> = cache
            .get_or_try_create("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(crate::Error::missing_credential("unavailable"))
            })
            .await;
        assert!(result.is_err());

        let result: Result<u32> = cache
            .get_or_try_create("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_method_key_distinguishes_parts() {
        let a = ClientCache::<u32>::method_key(&["awsv4", "profile-a"]);
        let b = ClientCache::<u32>::method_key(&["awsv4", "profile-b"]);
        let joined = ClientCache::<u32>::method_key(&["awsv4profile-a"]);
        assert_ne!(a, b);
        assert_ne!(a, joined);
        assert_eq!(a.len(), 64);
    }
}
