//! The offline controller: install, activate and fetch interception.
//!
//! Lifecycle: `Unregistered → Installing → Installed → Activating → Active`.
//! A failed install ends in `Failed`, from which install may be retried.
//! Only an `Active` controller answers from the cache; in every other state
//! requests go straight to the network.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::Method;
use tracing::{debug, info, warn};

use super::{CacheStorage, CachedResponse, Fetcher, Manifest, OfflineError, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Active,
    Failed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Unregistered => "unregistered",
            ControllerState::Installing => "installing",
            ControllerState::Installed => "installed",
            ControllerState::Activating => "activating",
            ControllerState::Active => "active",
            ControllerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Exact match in the cache
    Cache,
    /// Cache miss, fetched live
    Network,
    /// Network failed during a navigation, served the cached fallback document
    OfflineFallback,
    /// Not intercepted (controller not active, or not a GET)
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

pub struct OfflineController {
    manifest: Manifest,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: ControllerState,
}

impl OfflineController {
    pub fn new(
        manifest: Manifest,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            manifest,
            storage,
            fetcher,
            state: ControllerState::Unregistered,
        }
    }

    /// Pick up a previously completed install.
    ///
    /// Returns an `Active` controller when the storage already holds this
    /// manifest's cache with every asset, `None` otherwise.
    pub fn resume(
        manifest: Manifest,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Option<Self>, OfflineError> {
        let name = manifest.cache_name();
        if !storage.has(name)? {
            return Ok(None);
        }

        let cached: HashSet<String> = storage.urls(name)?.into_iter().collect();
        let missing = manifest
            .urls()?
            .into_iter()
            .filter(|url| !cached.contains(url.as_str()))
            .count();
        if missing > 0 {
            warn!(cache = name, missing = missing, "Cache is incomplete, not resuming");
            return Ok(None);
        }

        debug!(cache = name, "Resumed active cache");
        Ok(Some(Self {
            state: ControllerState::Active,
            ..Self::new(manifest, storage, fetcher)
        }))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ControllerState::Active
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn cache_name(&self) -> &str {
        self.manifest.cache_name()
    }

    /// Fetch every manifest asset and store them under the versioned cache
    /// name. All or nothing: any failure leaves no new cache behind and the
    /// controller in `Failed`.
    pub async fn install(&mut self) -> Result<(), OfflineError> {
        if !matches!(self.state, ControllerState::Unregistered | ControllerState::Failed) {
            return Err(OfflineError::InvalidState {
                actual: self.state,
                expected: ControllerState::Unregistered,
            });
        }

        self.state = ControllerState::Installing;
        info!(cache = self.cache_name(), "Installing offline cache");

        match self.populate().await {
            Ok(count) => {
                self.state = ControllerState::Installed;
                info!(cache = self.cache_name(), entries = count, "Installed offline cache");
                Ok(())
            }
            Err(e) => {
                self.state = ControllerState::Failed;
                warn!(cache = self.cache_name(), error = %e, "Offline cache install failed");
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, OfflineError> {
        let fetches = self.manifest.urls()?.into_iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let request = Request::get(url);
                let response = fetcher.fetch(&request).await?;
                if !response.is_ok() {
                    return Err(OfflineError::BadStatus {
                        url: request.url.to_string(),
                        status: response.status,
                    });
                }
                Ok::<_, OfflineError>((request.url.to_string(), response))
            }
        });

        // Nothing is written until every asset has been fetched
        let entries = try_join_all(fetches).await?;

        let name = self.cache_name();
        let existed = self.storage.has(name)?;
        self.storage.open(name)?;
        if let Err(e) = self.storage.put_all(name, &entries) {
            if !existed {
                if let Err(cleanup) = self.storage.delete(name) {
                    warn!(cache = name, error = %cleanup, "Failed to remove partial cache");
                }
            }
            return Err(e.into());
        }

        Ok(entries.len())
    }

    /// Delete every cache except the current one and start serving.
    ///
    /// The sweep is not atomic. A cache that cannot be deleted is logged and
    /// left behind; it only wastes space. Returns the names deleted.
    pub fn activate(&mut self) -> Result<Vec<String>, OfflineError> {
        if self.state != ControllerState::Installed {
            return Err(OfflineError::InvalidState {
                actual: self.state,
                expected: ControllerState::Installed,
            });
        }

        self.state = ControllerState::Activating;
        let current = self.cache_name().to_string();

        let names = match self.storage.keys() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list caches, skipping cleanup");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|n| *n != current) {
            match self.storage.delete(&name) {
                Ok(_) => {
                    debug!(cache = %name, "Deleted stale cache");
                    deleted.push(name);
                }
                Err(e) => warn!(cache = %name, error = %e, "Failed to delete stale cache"),
            }
        }

        self.state = ControllerState::Active;
        info!(cache = %current, deleted = deleted.len(), "Offline cache active");
        Ok(deleted)
    }

    /// Answer an intercepted request.
    ///
    /// GET requests are served from this version's cache first. Other
    /// generations left behind by an interrupted sweep are never consulted.
    /// On a miss the network is used; if that fails for a navigation, the
    /// cached fallback document is served. Every other failure is returned
    /// to the caller.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, OfflineError> {
        if !self.is_active() || request.method != Method::GET {
            let response = self.fetcher.fetch(request).await?;
            return Ok(Served {
                response,
                source: ResponseSource::Passthrough,
            });
        }

        match self.storage.get(self.cache_name(), request.cache_key()) {
            Ok(Some(response)) => {
                debug!(url = %request.url, "Cache hit");
                return Ok(Served {
                    response,
                    source: ResponseSource::Cache,
                });
            }
            Ok(None) => debug!(url = %request.url, "Cache miss"),
            Err(e) => warn!(url = %request.url, error = %e, "Cache lookup failed, using network"),
        }

        let error = match self.fetcher.fetch(request).await {
            Ok(response) => {
                return Ok(Served {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(e) => e,
        };

        if !request.is_navigation() {
            return Err(error);
        }

        let fallback = self.manifest.fallback_url()?;
        match self.storage.get(self.cache_name(), fallback.as_str()) {
            Ok(Some(response)) => {
                info!(
                    url = %request.url,
                    error = %error,
                    "Network unavailable, serving offline shell"
                );
                Ok(Served {
                    response,
                    source: ResponseSource::OfflineFallback,
                })
            }
            Ok(None) => Err(error),
            Err(e) => {
                warn!(error = %e, "Fallback lookup failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::testing::{small_manifest, FlakyCacheStorage, ScriptedFetcher};
    use crate::offline::MemoryCacheStorage;

    struct Fixture {
        storage: Arc<MemoryCacheStorage>,
        fetcher: Arc<ScriptedFetcher>,
        controller: OfflineController,
    }

    fn fixture() -> Fixture {
        let manifest = small_manifest();
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(ScriptedFetcher::serving(&manifest));
        let controller = OfflineController::new(manifest, storage.clone(), fetcher.clone());
        Fixture {
            storage,
            fetcher,
            controller,
        }
    }

    async fn active_fixture() -> Fixture {
        let mut f = fixture();
        f.controller.install().await.expect("install should succeed");
        f.controller.activate().expect("activate should succeed");
        f
    }

    fn url(path: &str) -> url::Url {
        small_manifest().resolve(path).unwrap()
    }

    // -------------------------------------------------------------------------
    // Install
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_install_caches_every_manifest_url() {
        let mut f = fixture();
        assert_eq!(f.controller.state(), ControllerState::Unregistered);

        f.controller.install().await.unwrap();
        assert_eq!(f.controller.state(), ControllerState::Installed);

        let mut expected: Vec<String> = small_manifest()
            .urls()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        expected.sort();
        assert_eq!(f.storage.urls("prompt-vault-cache-v1").unwrap(), expected);
    }

    #[tokio::test]
    async fn test_install_failure_is_all_or_nothing() {
        let mut f = fixture();
        f.fetcher.forget(url("/app/app.js").as_str());

        assert!(f.controller.install().await.is_err());
        assert_eq!(f.controller.state(), ControllerState::Failed);
        assert!(f.storage.keys().unwrap().is_empty());
        assert!(f.controller.activate().is_err());
    }

    #[tokio::test]
    async fn test_install_rejects_bad_status() {
        let mut f = fixture();
        f.fetcher.respond(url("/app/app.js").as_str(), 404, b"missing");

        let err = f.controller.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::BadStatus { status: 404, .. }));
        assert!(f.storage.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_write_failure_leaves_no_cache() {
        let manifest = small_manifest();
        let storage = Arc::new(FlakyCacheStorage::unwritable());
        let fetcher = Arc::new(ScriptedFetcher::serving(&manifest));
        let mut controller = OfflineController::new(manifest, storage.clone(), fetcher);

        assert!(matches!(controller.install().await, Err(OfflineError::Storage(_))));
        assert_eq!(controller.state(), ControllerState::Failed);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_can_be_retried_after_failure() {
        let mut f = fixture();
        f.fetcher.set_offline(true);
        assert!(f.controller.install().await.is_err());

        f.fetcher.set_offline(false);
        f.controller.install().await.unwrap();
        assert_eq!(f.controller.state(), ControllerState::Installed);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let mut f = fixture();
        f.controller.install().await.unwrap();
        let err = f.controller.install().await.unwrap_err();
        assert!(matches!(
            err,
            OfflineError::InvalidState { actual: ControllerState::Installed, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_install_passes_fetches_through() {
        let mut f = fixture();
        f.fetcher.set_offline(true);
        assert!(f.controller.install().await.is_err());
        f.fetcher.set_offline(false);

        let served = f.controller.handle_fetch(&Request::get(url("/app/app.js"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Passthrough);
    }

    // -------------------------------------------------------------------------
    // Activate
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_activate_deletes_other_generations() {
        let mut f = fixture();
        f.storage.open("prompt-vault-cache-v0").unwrap();
        f.storage.open("some-other-cache").unwrap();

        f.controller.install().await.unwrap();
        let mut deleted = f.controller.activate().unwrap();
        deleted.sort();

        assert_eq!(deleted, vec!["prompt-vault-cache-v0", "some-other-cache"]);
        assert_eq!(f.storage.keys().unwrap(), vec!["prompt-vault-cache-v1"]);
        assert_eq!(f.controller.state(), ControllerState::Active);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let mut f = fixture();
        let err = f.controller.activate().unwrap_err();
        assert!(matches!(
            err,
            OfflineError::InvalidState { actual: ControllerState::Unregistered, .. }
        ));
    }

    #[tokio::test]
    async fn test_interrupted_sweep_is_harmless() {
        let manifest = small_manifest();
        let storage = Arc::new(FlakyCacheStorage::undeletable(&["prompt-vault-cache-v0"]));
        storage.open("prompt-vault-cache-v0").unwrap();
        storage
            .put_all(
                "prompt-vault-cache-v0",
                &[(
                    url("/app/app.js").to_string(),
                    CachedResponse::new(url("/app/app.js").as_str(), 200, "STALE v0"),
                )],
            )
            .unwrap();
        let fetcher = Arc::new(ScriptedFetcher::serving(&manifest));
        let mut controller = OfflineController::new(manifest, storage.clone(), fetcher.clone());

        controller.install().await.unwrap();
        let deleted = controller.activate().unwrap();
        assert!(deleted.is_empty());
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(storage.keys().unwrap(), vec!["prompt-vault-cache-v0", "prompt-vault-cache-v1"]);

        // The leftover generation still holds the same URL; only the current one answers
        fetcher.set_offline(true);
        let served = controller.handle_fetch(&Request::get(url("/app/app.js"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body, b"network:/app/app.js");
    }

    // -------------------------------------------------------------------------
    // Fetch
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cached_asset_served_while_offline() {
        let f = active_fixture().await;
        f.fetcher.set_offline(true);

        let served = f.controller.handle_fetch(&Request::get(url("/app/app.js"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert!(!served.response.body.is_empty());
        assert_eq!(served.response.body, b"network:/app/app.js");
    }

    #[tokio::test]
    async fn test_cache_takes_precedence_over_network() {
        let f = active_fixture().await;
        f.fetcher.respond(url("/app/app.js").as_str(), 200, b"newer");
        let calls = f.fetcher.calls();

        let served = f.controller.handle_fetch(&Request::get(url("/app/app.js"))).await.unwrap();
        assert_eq!(served.response.body, b"network:/app/app.js");
        assert_eq!(f.fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_without_caching() {
        let f = active_fixture().await;
        let api = url("/api/data.json");
        f.fetcher.respond(api.as_str(), 200, b"{}");

        let served = f.controller.handle_fetch(&Request::get(api.clone())).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert!(f.storage.get(f.controller.cache_name(), api.as_str()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_fallback_document() {
        let f = active_fixture().await;
        f.fetcher.set_offline(true);

        let served = f
            .controller
            .handle_fetch(&Request::navigate(url("/app/prompts/42")))
            .await
            .unwrap();
        assert_eq!(served.source, ResponseSource::OfflineFallback);
        assert_eq!(served.response.body, b"network:/app/index.html");
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_fails() {
        let f = active_fixture().await;
        f.fetcher.set_offline(true);

        let err = f
            .controller
            .handle_fetch(&Request::get(url("/app/missing.css")))
            .await
            .unwrap_err();
        assert!(err.is_network_failure());
    }

    #[tokio::test]
    async fn test_offline_navigation_without_fallback_fails() {
        let manifest = small_manifest().with_fallback_document("/app/not-cached.html");
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(ScriptedFetcher::serving(&manifest));
        let mut controller = OfflineController::new(manifest, storage, fetcher.clone());
        controller.install().await.unwrap();
        controller.activate().unwrap();

        fetcher.set_offline(true);
        let result = controller.handle_fetch(&Request::navigate(url("/app/elsewhere"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_non_get_is_never_intercepted() {
        let f = active_fixture().await;
        let request = Request::get(url("/app/app.js")).with_method(Method::POST);

        let served = f.controller.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Passthrough);

        f.fetcher.set_offline(true);
        let nav_post = Request::navigate(url("/app/")).with_method(Method::POST);
        assert!(f.controller.handle_fetch(&nav_post).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_fetches() {
        let f = active_fixture().await;
        f.fetcher.set_offline(true);

        let requests: Vec<Request> =
            small_manifest().urls().unwrap().into_iter().map(Request::get).collect();
        let fetches = requests.iter().map(|r| f.controller.handle_fetch(r));
        let results = futures::future::join_all(fetches).await;
        assert!(results
            .iter()
            .all(|r| matches!(r, Ok(Served { source: ResponseSource::Cache, .. }))));
    }

    // -------------------------------------------------------------------------
    // Resume
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_resume_after_install() {
        let f = active_fixture().await;
        let resumed =
            OfflineController::resume(small_manifest(), f.storage.clone(), f.fetcher.clone())
                .unwrap()
                .expect("complete cache should resume");
        assert!(resumed.is_active());
    }

    #[tokio::test]
    async fn test_resumed_controller_ignores_older_generations() {
        let manifest = small_manifest();
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(ScriptedFetcher::serving(&manifest));

        storage.open("prompt-vault-cache-v0").unwrap();
        storage
            .put_all(
                "prompt-vault-cache-v0",
                &[(
                    url("/app/index.html").to_string(),
                    CachedResponse::new(url("/app/index.html").as_str(), 200, "STALE v0"),
                )],
            )
            .unwrap();
        let mut installer =
            OfflineController::new(manifest.clone(), storage.clone(), fetcher.clone());
        installer.install().await.unwrap();

        let resumed = OfflineController::resume(manifest, storage.clone(), fetcher.clone())
            .unwrap()
            .expect("complete cache should resume");
        fetcher.set_offline(true);

        let served = resumed.handle_fetch(&Request::get(url("/app/index.html"))).await.unwrap();
        assert_eq!(served.response.body, b"network:/app/index.html");

        let served = resumed.handle_fetch(&Request::navigate(url("/app/settings"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::OfflineFallback);
        assert_eq!(served.response.body, b"network:/app/index.html");
    }

    #[test]
    fn test_resume_requires_complete_cache() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        assert!(OfflineController::resume(small_manifest(), storage.clone(), fetcher.clone())
            .unwrap()
            .is_none());

        storage.open("prompt-vault-cache-v1").unwrap();
        assert!(OfflineController::resume(small_manifest(), storage, fetcher)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ControllerState::Active.to_string(), "active");
        assert_eq!(ControllerState::Failed.to_string(), "failed");
    }
}
