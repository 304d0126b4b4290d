//! Named caches of responses keyed by request URL.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::CachedResponse;

/// Storage for named response caches.
///
/// Implementations must be safe for concurrent lookups.
pub trait CacheStorage: Send + Sync {
    /// Create the cache `name` if it does not exist yet.
    fn open(&self, name: &str) -> Result<()>;

    fn has(&self, name: &str) -> Result<bool>;

    /// Cache names in creation order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Delete the cache `name`. Returns whether it existed.
    fn delete(&self, name: &str) -> Result<bool>;

    /// Store every `(url, response)` pair in the cache `name`, which must exist.
    fn put_all(&self, name: &str, entries: &[(String, CachedResponse)]) -> Result<()>;

    fn get(&self, name: &str, url: &str) -> Result<Option<CachedResponse>>;

    /// URLs stored in the cache `name`.
    fn urls(&self, name: &str) -> Result<Vec<String>>;
}

#[derive(Default)]
struct MemoryCaches {
    order: Vec<String>,
    caches: HashMap<String, HashMap<String, CachedResponse>>,
}

/// In-process cache storage.
#[derive(Default)]
pub struct MemoryCacheStorage {
    inner: Mutex<MemoryCaches>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryCaches>> {
        self.inner.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.caches.contains_key(name) {
            inner.order.push(name.to_string());
            inner.caches.insert(name.to_string(), HashMap::new());
        }
        Ok(())
    }

    fn has(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.caches.contains_key(name))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.order.clone())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        inner.order.retain(|n| n != name);
        Ok(inner.caches.remove(name).is_some())
    }

    fn put_all(&self, name: &str, entries: &[(String, CachedResponse)]) -> Result<()> {
        let mut inner = self.lock()?;
        let cache = inner
            .caches
            .get_mut(name)
            .ok_or_else(|| anyhow!("Cache not open: {}", name))?;
        for (url, response) in entries {
            cache.insert(url.clone(), response.clone());
        }
        Ok(())
    }

    fn get(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        Ok(self
            .lock()?
            .caches
            .get(name)
            .and_then(|cache| cache.get(url))
            .cloned())
    }

    fn urls(&self, name: &str) -> Result<Vec<String>> {
        let inner = self.lock()?;
        let mut urls: Vec<String> = inner
            .caches
            .get(name)
            .map(|cache| cache.keys().cloned().collect())
            .unwrap_or_default();
        urls.sort();
        Ok(urls)
    }
}
