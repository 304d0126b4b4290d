//! Application wiring: the prompt store and the offline registration, built
//! from the loaded configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use promptvault_core::offline::{DiskCacheStorage, HttpFetcher, Manifest, Registration};
use promptvault_core::storage::FileStorage;
use promptvault_core::PromptStore;
use tracing::debug;

use crate::config::Config;

pub struct App {
    pub config: Config,
    pub store: PromptStore<FileStorage>,
}

/// An offline registration together with the manifest it should serve.
pub struct Offline {
    pub registration: Registration,
    pub manifest: Manifest,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        debug!(?data_dir, "Data directory configured");

        let storage = FileStorage::new(data_dir)?;
        let mut store = PromptStore::new(storage);
        store.load();

        Ok(Self { config, store })
    }

    /// The offline registration, or `None` if no origin is configured.
    ///
    /// An install from an earlier session is restored so requests are served
    /// from its cache.
    pub async fn offline(&self) -> Result<Option<Offline>> {
        let Some(manifest) = self.config.manifest()? else {
            return Ok(None);
        };

        let cache_dir = self.config.offline_cache_dir()?;
        debug!(?cache_dir, "Offline cache directory configured");

        let storage = DiskCacheStorage::new(cache_dir)?;
        let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
        let registration = Registration::new(Arc::new(storage), Arc::new(fetcher));

        let restored = registration.restore(manifest.clone()).await?;
        debug!(restored, cache = manifest.cache_name(), "Offline registration ready");

        Ok(Some(Offline {
            registration,
            manifest,
        }))
    }
}
