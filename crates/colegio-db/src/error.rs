//! Database-specific error types and conversions.

use colegio_core::error::ColegioError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid stored value: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for ColegioError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ColegioError::NotFound { entity, id },
            other => ColegioError::Database(other.to_string()),
        }
    }
}
