//! Cache-first offline delivery of the front-end shell.
//!
//! This module provides:
//! - `Manifest`: the versioned cache name and the fixed list of shell assets
//! - `CacheStorage`: named caches of responses (`MemoryCacheStorage`,
//!   `DiskCacheStorage`)
//! - `Fetcher`: live network access (`HttpFetcher`)
//! - `OfflineController`: install / activate / fetch interception
//! - `Registration`: keeps the one active controller and swaps in new versions
//!
//! Cache eviction is a whole-generation sweep keyed by cache name at
//! activation. There is no TTL, size bound or LRU.

pub mod cache_storage;
pub mod controller;
pub mod disk;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod registration;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use cache_storage::{CacheStorage, MemoryCacheStorage};
pub use controller::{ControllerState, OfflineController, ResponseSource, Served};
pub use disk::DiskCacheStorage;
pub use error::OfflineError;
pub use fetcher::{Fetcher, HttpFetcher};
pub use manifest::Manifest;
pub use registration::Registration;
pub use request::{CachedResponse, Request, RequestMode};
