use thiserror::Error;

/// Failures reported by [`BookProvider`](super::BookProvider). Validation and
/// routing problems are raised before anything is written.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown URI: {0}")]
    UnknownUri(String),

    #[error("{operation} is not supported for {uri}")]
    Unsupported {
        operation: &'static str,
        uri: String,
    },

    #[error("Failed to insert new book for {uri}")]
    Insert {
        uri: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to update books for {uri}")]
    Update {
        uri: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ProviderError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ProviderError::Validation(_))
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
