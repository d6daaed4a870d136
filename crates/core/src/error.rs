//! Domain error type shared by the core and the store.

use std::fmt::Display;

/// Every fallible core operation reports one of these.
///
/// Guarded no-ops (rollback without a target, trashing a trashed page) are
/// not errors; they return [`Effect::Unchanged`](crate::page::Effect).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The stored state moved since it was read.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No identity was presented but the operation requires one.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An identity was presented but lacks the required level.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
