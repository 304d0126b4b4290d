//! Keeps the single active offline controller.
//!
//! A new version is installed and activated while the previous controller
//! keeps answering requests; only then is it swapped in.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::{
    CacheStorage, Fetcher, Manifest, OfflineController, OfflineError, Request, ResponseSource,
    Served,
};

pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<OfflineController>>>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            active: RwLock::new(None),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Install and activate `manifest`, then make it the active controller.
    ///
    /// On failure the previously active controller (if any) stays in place.
    pub async fn register(
        &self,
        manifest: Manifest,
    ) -> Result<Arc<OfflineController>, OfflineError> {
        let mut controller =
            OfflineController::new(manifest, Arc::clone(&self.storage), Arc::clone(&self.fetcher));
        controller.install().await?;
        controller.activate()?;

        let controller = Arc::new(controller);
        let previous = self.active.write().await.replace(Arc::clone(&controller));
        info!(
            cache = controller.cache_name(),
            previous = previous.as_ref().map(|c| c.cache_name()),
            "Claimed offline controller"
        );
        Ok(controller)
    }

    /// Reactivate a version installed in an earlier session.
    ///
    /// Returns `false` if the cache for `manifest` is missing or incomplete.
    pub async fn restore(&self, manifest: Manifest) -> Result<bool, OfflineError> {
        let resumed = OfflineController::resume(
            manifest,
            Arc::clone(&self.storage),
            Arc::clone(&self.fetcher),
        )?;
        match resumed {
            Some(controller) => {
                *self.active.write().await = Some(Arc::new(controller));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn active(&self) -> Option<Arc<OfflineController>> {
        self.active.read().await.clone()
    }

    /// Answer a request with the active controller, or straight from the
    /// network when none is active.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, OfflineError> {
        // Clone out of the lock so a concurrent register never waits on a fetch
        let active = self.active().await;
        match active {
            Some(controller) => controller.handle_fetch(request).await,
            None => {
                let response = self.fetcher.fetch(request).await?;
                Ok(Served {
                    response,
                    source: ResponseSource::Passthrough,
                })
            }
        }
    }
}
