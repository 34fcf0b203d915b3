//! Academic term (school year) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A year-scoped container. Benefits and registrations are partitioned
/// per (institution, term).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicTerm {
    pub id: Uuid,
    pub year: i32,
    pub name: String,
    /// Whether this is the current term.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAcademicTerm {
    pub year: i32,
    pub name: String,
    pub active: bool,
}
