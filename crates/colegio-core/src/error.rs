//! Error types for the Colegio system.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ColegioError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// Cross-tenant access attempt, or a scoped operation without a
    /// resolved institution.
    #[error("Scope violation: {reason}")]
    ScopeViolation { reason: String },

    #[error("Student {student_id} already holds an active meal benefit for term {term_id}")]
    DuplicateBenefit { student_id: Uuid, term_id: Uuid },

    #[error("Student {student_id} has no active meal benefit")]
    NoBenefit { student_id: Uuid },

    /// The minimum interval since the last registration has not elapsed.
    #[error("Already registered at {last_served_at}; wait {remaining_minutes} more minute(s)")]
    TooSoon {
        remaining_minutes: i64,
        last_served_at: DateTime<Utc>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ColegioError {
    pub fn scope(reason: impl Into<String>) -> Self {
        Self::ScopeViolation {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type ColegioResult<T> = Result<T, ColegioError>;
