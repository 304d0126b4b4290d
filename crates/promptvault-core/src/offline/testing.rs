//! Test doubles for the offline controller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use url::Url;

use super::{
    CacheStorage, CachedResponse, Fetcher, Manifest, MemoryCacheStorage, OfflineError, Request,
};

pub fn origin() -> Url {
    Url::parse("https://example.github.io").unwrap()
}

pub fn small_manifest() -> Manifest {
    Manifest::new(origin())
        .with_paths(["/app/", "/app/index.html", "/app/app.js"])
        .with_fallback_document("/app/index.html")
}

/// Serves canned responses; can be switched offline.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, CachedResponse>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for every path in `manifest`.
    pub fn serving(manifest: &Manifest) -> Self {
        let fetcher = Self::new();
        for url in manifest.urls().unwrap() {
            let body = format!("network:{}", url.path());
            fetcher.respond(url.as_str(), 200, body.as_bytes());
        }
        fetcher
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), CachedResponse::new(url, status, body.to_vec()));
    }

    pub fn forget(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, OfflineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(OfflineError::Unreachable(request.url.to_string()));
        }
        match self.responses.lock().unwrap().get(request.cache_key()) {
            Some(response) => Ok(response.clone()),
            None => Err(OfflineError::Unreachable(format!("no route to {}", request.url))),
        }
    }
}

/// Memory cache storage that fails to delete or write chosen caches.
#[derive(Default)]
pub struct FlakyCacheStorage {
    inner: MemoryCacheStorage,
    undeletable: Vec<String>,
    unwritable: bool,
}

impl FlakyCacheStorage {
    pub fn undeletable(names: &[&str]) -> Self {
        Self {
            undeletable: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn unwritable() -> Self {
        Self {
            unwritable: true,
            ..Self::default()
        }
    }
}

impl CacheStorage for FlakyCacheStorage {
    fn open(&self, name: &str) -> Result<()> {
        self.inner.open(name)
    }

    fn has(&self, name: &str) -> Result<bool> {
        self.inner.has(name)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }

    fn delete(&self, name: &str) -> Result<bool> {
        if self.undeletable.iter().any(|n| n == name) {
            return Err(anyhow!("device busy: {}", name));
        }
        self.inner.delete(name)
    }

    fn put_all(&self, name: &str, entries: &[(String, CachedResponse)]) -> Result<()> {
        if self.unwritable {
            bail!("disk full");
        }
        self.inner.put_all(name, entries)
    }

    fn get(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        self.inner.get(name, url)
    }

    fn urls(&self, name: &str) -> Result<Vec<String>> {
        self.inner.urls(name)
    }
}
