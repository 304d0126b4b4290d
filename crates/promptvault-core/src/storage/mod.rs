//! On-device key-value storage for serialized blobs.
//!
//! This module provides the `KeyValueStorage` trait used by the prompt store
//! and two backends:
//! - `FileStorage`: one JSON file per key in a data directory
//! - `MemoryStorage`: in-process map, mainly for tests
//!
//! Backends give no transactional guarantees beyond last-write-wins.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

/// Get/set access to serialized values by key.
pub trait KeyValueStorage {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}
