use thiserror::Error;

/// Why a create or update was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Prompt text is required")]
    EmptyText,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid prompt: {0}")]
    Validation(#[from] ValidationError),

    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Short category name for logging.
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::NotFound(_) => "not_found",
            StoreError::Storage(_) => "storage",
            StoreError::Serialization(_) => "serialization",
        }
    }
}
