//! The prompt store: the in-memory prompt collection and its write-through
//! persistence.
//!
//! `PromptStore` owns the collection and a `KeyValueStorage` backend. The
//! whole collection is serialized as one JSON array under `STORAGE_KEY` and
//! rewritten after every mutation.
//!
//! `create`/`update` silently ignore input with an empty title or text. The
//! `try_create`/`try_update` variants report the reason instead.

pub mod error;
pub mod ids;

pub use error::{StoreError, ValidationError};
pub use ids::IdGenerator;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::host::Confirm;
use crate::models::prompt::parse_collection;
use crate::models::{Prompt, PromptCollection};
use crate::storage::KeyValueStorage;
use crate::utils::contains_ignore_case;

/// Storage key for the serialized collection. The version suffix is the only
/// forward-compatibility mechanism.
pub const STORAGE_KEY: &str = "promptVault_v1";

/// Message shown by the confirmation collaborator before a delete.
pub const DELETE_CONFIRMATION: &str = "Delete this prompt?";

pub type Result<T> = std::result::Result<T, StoreError>;

/// Trimmed, validated prompt fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFields {
    pub title: String,
    pub text: String,
    pub tag: String,
}

impl PromptFields {
    pub fn new(title: &str, text: &str, tag: &str) -> std::result::Result<Self, ValidationError> {
        let title = title.trim();
        let text = text.trim();

        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }

        Ok(Self {
            title: title.to_string(),
            text: text.to_string(),
            tag: tag.trim().to_string(),
        })
    }
}

pub struct PromptStore<S: KeyValueStorage> {
    storage: S,
    prompts: PromptCollection,
    ids: IdGenerator,
}

impl<S: KeyValueStorage> PromptStore<S> {
    /// Create an empty store over `storage`. Call `load` to read saved prompts.
    pub fn new(storage: S) -> Self {
        Self::with_id_generator(storage, IdGenerator::new())
    }

    pub fn with_id_generator(storage: S, ids: IdGenerator) -> Self {
        Self {
            storage,
            prompts: Vec::new(),
            ids,
        }
    }

    /// Read the saved collection, falling back to empty if it is missing or
    /// unusable. Never fails.
    pub fn load(&mut self) {
        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read saved prompts, starting empty");
                None
            }
        };

        self.prompts = match raw {
            None => Vec::new(),
            Some(raw) => parse_collection(&raw).unwrap_or_else(|| {
                warn!(bytes = raw.len(), "Saved prompts are corrupt, starting empty");
                Vec::new()
            }),
        };

        info!(count = self.prompts.len(), "Loaded prompts");
    }

    /// Persist the current collection.
    pub fn save(&mut self) -> Result<()> {
        let contents = serde_json::to_string(&self.prompts)?;
        self.storage.set(STORAGE_KEY, &contents)?;
        debug!(count = self.prompts.len(), "Saved prompts");
        Ok(())
    }

    /// Create a prompt. Returns `Ok(None)` without writing if the title or
    /// text is empty after trimming.
    pub fn create(&mut self, title: &str, text: &str, tag: &str) -> Result<Option<Prompt>> {
        match self.try_create(title, text, tag) {
            Ok(prompt) => Ok(Some(prompt)),
            Err(StoreError::Validation(reason)) => {
                debug!(%reason, "Ignoring invalid prompt");
                Ok(None)
            }
            Err(e) => {
                warn!(category = e.category(), error = %e, "Failed to create prompt");
                Err(e)
            }
        }
    }

    pub fn try_create(&mut self, title: &str, text: &str, tag: &str) -> Result<Prompt> {
        let fields = PromptFields::new(title, text, tag)?;
        let now = Utc::now().timestamp_millis();

        let prompt = Prompt {
            id: self.fresh_id(now),
            title: fields.title,
            text: fields.text,
            tag: fields.tag,
            created_at: now,
        };
        self.prompts.push(prompt.clone());
        self.save()?;

        info!(id = %prompt.id, "Created prompt");
        Ok(prompt)
    }

    /// Next generated id not already held by a loaded prompt. Stored ids may
    /// come from another session or the browser front-end, and a duplicate
    /// would make the whole collection unreadable.
    fn fresh_id(&mut self, now_ms: i64) -> String {
        let mut id = self.ids.next_id(now_ms);
        while self.get(&id).is_some() {
            debug!(id = %id, "Generated id already in use");
            id = self.ids.next_id(now_ms);
        }
        id
    }

    /// Replace title, text and tag of the prompt with `id`.
    ///
    /// Invalid input is ignored without writing. Valid input is written
    /// through even when no prompt has that id, leaving the collection as is.
    pub fn update(
        &mut self,
        id: &str,
        title: &str,
        text: &str,
        tag: &str,
    ) -> Result<Option<Prompt>> {
        let fields = match PromptFields::new(title, text, tag) {
            Ok(fields) => fields,
            Err(reason) => {
                debug!(id = id, %reason, "Ignoring invalid prompt update");
                return Ok(None);
            }
        };

        let updated = self.apply_update(id, fields);
        self.save()?;
        Ok(updated)
    }

    pub fn try_update(&mut self, id: &str, title: &str, text: &str, tag: &str) -> Result<Prompt> {
        let fields = PromptFields::new(title, text, tag)?;
        let updated = self
            .apply_update(id, fields)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.save()?;
        Ok(updated)
    }

    fn apply_update(&mut self, id: &str, fields: PromptFields) -> Option<Prompt> {
        let prompt = self.prompts.iter_mut().find(|p| p.id == id)?;
        prompt.title = fields.title;
        prompt.text = fields.text;
        prompt.tag = fields.tag;

        info!(id = id, "Updated prompt");
        Some(prompt.clone())
    }

    /// Delete the prompt with `id` once `confirm` agrees.
    ///
    /// Returns whether a prompt was removed. A declined confirmation changes
    /// nothing and writes nothing.
    pub fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(DELETE_CONFIRMATION) {
            debug!(id = id, "Delete declined");
            return Ok(false);
        }

        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        let removed = self.prompts.len() != before;
        self.save()?;

        if removed {
            info!(id = id, "Deleted prompt");
        }
        Ok(removed)
    }

    /// Prompts whose title, text or tag contain `query`, ignoring case.
    ///
    /// An empty query returns everything. Results are oldest first.
    pub fn search(&self, query: &str) -> Vec<&Prompt> {
        let query = query.trim();
        if query.is_empty() {
            return self.prompts.iter().collect();
        }

        self.prompts
            .iter()
            .filter(|p| contains_ignore_case(&p.search_haystack(), query))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
