use folio_core::error::CoreError;
use folio_core::revision::RevisionError;

/// Error type for store-backed page workflows.
///
/// Wraps [`CoreError`] for domain outcomes and keeps database failures
/// separate so callers can map them independently.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level error from `folio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<RevisionError> for StoreError {
    fn from(err: RevisionError) -> Self {
        StoreError::Core(err.into())
    }
}

impl StoreError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            StoreError::Core(core) => Some(core),
            StoreError::Database(_) => None,
        }
    }
}
