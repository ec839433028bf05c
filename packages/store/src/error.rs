use thiserror::Error;

/// Errors returned by collection stores, blob stores and the layers on top.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("access denied")]
    Forbidden,

    #[error("not signed in")]
    Unauthenticated,

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
