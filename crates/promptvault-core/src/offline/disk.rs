//! Cache storage on the local file system.
//!
//! Layout under the root directory:
//! - `caches.json`: cache names in creation order
//! - `<sha256(name)>/<sha256(url)>.body`: raw response body
//! - `<sha256(name)>/<sha256(url)>.json`: url, status and headers
//!
//! Files are replaced through a temporary file and a rename. The metadata
//! file is removed before an entry is overwritten and written last, so an
//! interrupted write leaves the entry missing rather than mismatched.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CacheStorage, CachedResponse};

const INDEX_FILE: &str = "caches.json";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

pub struct DiskCacheStorage {
    root: PathBuf,
    /// Serializes index updates
    index_lock: Mutex<()>,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory: {}", root.display()))?;
        Ok(Self {
            root,
            index_lock: Mutex::new(()),
        })
    }

    fn hash(value: &str) -> String {
        hex::encode(Sha256::digest(value.as_bytes()))
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join(Self::hash(name))
    }

    fn entry_paths(&self, name: &str, url: &str) -> (PathBuf, PathBuf) {
        let dir = self.cache_dir(name);
        let stem = Self::hash(url);
        (dir.join(format!("{}.json", stem)), dir.join(format!("{}.body", stem)))
    }

    /// Replace `path` with `contents` via a sibling temporary file.
    fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)
    }

    fn read_index(&self) -> Result<Vec<String>> {
        let path = self.root.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read cache index")?;
        serde_json::from_str(&contents).context("Failed to parse cache index")
    }

    fn write_index(&self, names: &[String]) -> Result<()> {
        let path = self.root.join(INDEX_FILE);
        Self::write_atomic(&path, serde_json::to_string_pretty(names)?.as_bytes())
            .context("Failed to write cache index")
    }

    fn with_index<T>(&self, f: impl FnOnce(&mut Vec<String>) -> T) -> Result<T> {
        let _guard = self.index_lock.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut names = self.read_index()?;
        let before = names.clone();
        let result = f(&mut names);
        if names != before {
            self.write_index(&names)?;
        }
        Ok(result)
    }
}

impl CacheStorage for DiskCacheStorage {
    fn open(&self, name: &str) -> Result<()> {
        let dir = self.cache_dir(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache: {}", name))?;

        self.with_index(|names| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        })
    }

    fn has(&self, name: &str) -> Result<bool> {
        Ok(self.read_index()?.iter().any(|n| n == name))
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.read_index()
    }

    fn delete(&self, name: &str) -> Result<bool> {
        // Drop from the index first; an orphaned directory is only wasted space
        let existed = self.with_index(|names| {
            let before = names.len();
            names.retain(|n| n != name);
            names.len() != before
        })?;

        let dir = self.cache_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove cache directory: {}", name))?;
        }

        debug!(cache = name, existed = existed, "Deleted cache");
        Ok(existed)
    }

    fn put_all(&self, name: &str, entries: &[(String, CachedResponse)]) -> Result<()> {
        if !self.has(name)? {
            bail!("Cache not open: {}", name);
        }

        for (url, response) in entries {
            let (meta_path, body_path) = self.entry_paths(name, url);
            if meta_path.exists() {
                std::fs::remove_file(&meta_path)
                    .with_context(|| format!("Failed to replace cache entry for {}", url))?;
            }
            Self::write_atomic(&body_path, &response.body)
                .with_context(|| format!("Failed to write cached body for {}", url))?;

            let meta = EntryMeta {
                url: url.clone(),
                status: response.status,
                headers: response.headers.clone(),
            };
            Self::write_atomic(&meta_path, &serde_json::to_vec(&meta)?)
                .with_context(|| format!("Failed to write cache entry for {}", url))?;
        }

        debug!(cache = name, entries = entries.len(), "Stored cache entries");
        Ok(())
    }

    fn get(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        let (meta_path, body_path) = self.entry_paths(name, url);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read(&meta_path)
            .with_context(|| format!("Failed to read cache entry for {}", url))?;
        let meta: EntryMeta = serde_json::from_slice(&contents)
            .with_context(|| format!("Failed to parse cache entry for {}", url))?;
        let body = std::fs::read(&body_path)
            .with_context(|| format!("Failed to read cached body for {}", url))?;

        Ok(Some(CachedResponse {
            url: meta.url,
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    fn urls(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.cache_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut urls = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read(&path)?;
            if let Ok(meta) = serde_json::from_slice::<EntryMeta>(&contents) {
                urls.push(meta.url);
            }
        }
        urls.sort();
        Ok(urls)
    }
}
