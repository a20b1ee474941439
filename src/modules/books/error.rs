//! Errors raised by the rental ledger.

use shelf_db::{DocumentId, StoreError};
use shelf_http::AppError;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure classes a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request body or identity token
    Parse,
    /// Referenced book or rental is absent
    NotFound,
    /// No copies left to rent, or no room left for another copy
    Conflict,
    /// Return without an active rental
    FailedPrecondition,
    /// Store failure or violated post-condition
    Internal,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid book ID format: {0}")]
    InvalidId(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("book {0} not found")]
    BookNotFound(DocumentId),

    #[error("no copies of book {0} available for rental")]
    NoCopiesAvailable(DocumentId),

    #[error("book {0} already holds the maximum number of copies")]
    CopyLimitReached(DocumentId),

    #[error("book {0} is not currently rented")]
    NotRented(DocumentId),

    #[error("ledger invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidId(_) | LedgerError::InvalidBody(_) => ErrorKind::Parse,
            LedgerError::BookNotFound(_) => ErrorKind::NotFound,
            LedgerError::NoCopiesAvailable(_) | LedgerError::CopyLimitReached(_) => {
                ErrorKind::Conflict
            }
            LedgerError::NotRented(_) => ErrorKind::FailedPrecondition,
            LedgerError::Invariant(_) | LedgerError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err.kind() {
            ErrorKind::Parse => AppError::bad_request(err.to_string()),
            ErrorKind::NotFound => AppError::not_found(err.to_string()),
            ErrorKind::Conflict => {
                let details = match &err {
                    LedgerError::NoCopiesAvailable(id) => {
                        vec![serde_json::json!({ "book_id": id.to_string(), "available_count": 0 })]
                    }
                    _ => Vec::new(),
                };
                AppError::conflict(details, err.to_string())
            }
            ErrorKind::FailedPrecondition => AppError::failed_precondition(err.to_string()),
            ErrorKind::Internal => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}
