//! The prompt record and its on-disk collection format.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A single saved prompt.
///
/// Field names serialize in camelCase (`createdAt`) so the stored collection
/// stays readable by the browser front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tag: String,
    /// Milliseconds since the Unix epoch, set once at creation.
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub created_at: i64,
}

impl Prompt {
    /// Text used for free-text search: title, text and tag joined by spaces.
    pub fn search_haystack(&self) -> String {
        format!("{} {} {}", self.title, self.text, self.tag)
    }

    /// A stored record is usable only with a non-empty id, title and text.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty() && !self.text.trim().is_empty()
    }

    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }
}

/// Ordered list of prompts, oldest first, as persisted under one storage key.
pub type PromptCollection = Vec<Prompt>;

/// Parse a stored collection.
///
/// Returns `None` unless the value is a JSON array of valid records with
/// unique ids.
pub fn parse_collection(raw: &str) -> Option<PromptCollection> {
    let prompts: PromptCollection = serde_json::from_str(raw).ok()?;

    let mut seen = HashSet::with_capacity(prompts.len());
    for prompt in &prompts {
        if !prompt.is_valid() || !seen.insert(prompt.id.as_str()) {
            return None;
        }
    }

    Some(prompts)
}
