//! The fixed set of shell assets cached for offline use.
//!
//! The cache name carries the version. Bump it whenever the asset list or
//! any asset's content changes, otherwise clients keep serving the old shell.

use url::Url;

use super::OfflineError;

/// Prefix shared by every generation of the shell cache.
pub const CACHE_NAME_PREFIX: &str = "prompt-vault-cache-v";

/// Current cache generation.
pub const CACHE_VERSION: u32 = 1;

/// Assets cached at install time, relative to the origin.
pub const OFFLINE_PATHS: &[&str] = &[
    "/Prompt-Organiser/",
    "/Prompt-Organiser/index.html",
    "/Prompt-Organiser/style.css",
    "/Prompt-Organiser/app.js",
    "/Prompt-Organiser/manifest.webmanifest",
    "/Prompt-Organiser/icon-192.png",
    "/Prompt-Organiser/icon-512.png",
];

/// Document served for navigations when the network is unavailable.
pub const FALLBACK_DOCUMENT: &str = "/Prompt-Organiser/index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    cache_name: String,
    origin: Url,
    paths: Vec<String>,
    fallback_document: String,
}

impl Manifest {
    /// The built-in asset list served from `origin`.
    pub fn new(origin: Url) -> Self {
        Self {
            cache_name: Self::cache_name_for(CACHE_VERSION),
            origin,
            paths: OFFLINE_PATHS.iter().map(|p| p.to_string()).collect(),
            fallback_document: FALLBACK_DOCUMENT.to_string(),
        }
    }

    pub fn cache_name_for(version: u32) -> String {
        format!("{}{}", CACHE_NAME_PREFIX, version)
    }

    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    pub fn with_version(self, version: u32) -> Self {
        self.with_cache_name(Self::cache_name_for(version))
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fallback_document(mut self, path: impl Into<String>) -> Self {
        self.fallback_document = path.into();
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Resolve a path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, OfflineError> {
        self.origin.join(path).map_err(|source| OfflineError::InvalidUrl {
            url: path.to_string(),
            source,
        })
    }

    /// Every asset URL, in manifest order.
    pub fn urls(&self) -> Result<Vec<Url>, OfflineError> {
        self.paths.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn fallback_url(&self) -> Result<Url, OfflineError> {
        self.resolve(&self.fallback_document)
    }
}
