//! Error types for the document store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`crate::DocumentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value could not be converted to or from a document.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure while reading or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document does not have the expected shape.
    #[error("invalid document in '{collection}': {message}")]
    InvalidDocument {
        /// Collection holding the document.
        collection: String,
        /// What was wrong with it.
        message: String,
    },

    /// An update or insert tried to write a field the store owns.
    #[error("field '{field}' is immutable")]
    ImmutableField {
        /// The rejected field name.
        field: String,
    },
}

impl StoreError {
    pub(crate) fn invalid_document(collection: &str, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}
