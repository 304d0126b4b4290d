//! Core library for promptvault.
//!
//! - `store`: the prompt collection with write-through persistence
//! - `storage`: on-device key-value storage backends
//! - `offline`: cache-first delivery of the front-end shell
//! - `host`: collaborators the front-end provides (confirmation, clipboard)

pub mod host;
pub mod models;
pub mod offline;
pub mod storage;
pub mod store;
pub mod utils;

pub use models::Prompt;
pub use store::{PromptStore, StoreError, ValidationError, STORAGE_KEY};
