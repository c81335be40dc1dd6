//! Error types shared across the crate.

use thiserror::Error;
use uuid::Uuid;

use crate::core::queue::PatientStatus;

/// A severity input outside its enumerated domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriageError {
    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("corrupt {entity} record: {reason}")]
    Corrupt { entity: &'static str, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }
}

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot {action} patient {patient_id} while {status}")]
    InvalidTransition {
        patient_id: Uuid,
        action: &'static str,
        status: PatientStatus,
    },

    #[error("you must be signed in to {0}")]
    Unauthenticated(&'static str),
}

impl ClinicError {
    /// True when the error is a missing record rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClinicError::Store(StoreError::NotFound { .. }))
    }
}
