//! Data models for prompt vault entities.
//!
//! - `Prompt`: a saved snippet with title, payload text and optional tag
//! - `PromptCollection`: the serialized form of every saved prompt

pub mod prompt;

pub use prompt::{Prompt, PromptCollection};
