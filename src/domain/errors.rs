//! Domain errors for the HACCP cleaning plan.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while managing the cleaning plan.
///
/// Every failure is scoped to the single operation attempted; none of these
/// is fatal to the process.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Cleaning task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Cleaning record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Cleaning reference not found: {0}")]
    ReferenceNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to load {what}: {reason}")]
    FetchFailed { what: String, reason: String },

    #[error("Update failed for record {record_id}: {reason}")]
    UpdateFailed { record_id: Uuid, reason: String },

    #[error("Photo storage error: {0}")]
    PhotoStorage(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Short machine-readable code, used by the CLI in JSON mode.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "task_not_found",
            Self::RecordNotFound(_) => "record_not_found",
            Self::ReferenceNotFound(_) => "reference_not_found",
            Self::ValidationFailed(_) => "validation_error",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::UpdateFailed { .. } => "update_failed",
            Self::PhotoStorage(_) => "photo_storage_error",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::DatabaseError(_) => "database_error",
            Self::SerializationError(_) => "serialization_error",
        }
    }

    /// Whether the operation may succeed if the user simply tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. }
                | Self::UpdateFailed { .. }
                | Self::PhotoStorage(_)
                | Self::ConcurrencyConflict { .. }
                | Self::DatabaseError(_)
        )
    }

    pub(crate) fn fetch_failed(what: impl Into<String>, err: &Self) -> Self {
        Self::FetchFailed {
            what: what.into(),
            reason: err.to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
