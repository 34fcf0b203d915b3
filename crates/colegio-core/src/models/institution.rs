//! Institution domain model.
//!
//! Institutions are the tenants of Colegio. Every school-owned record
//! carries an `institution_id` and is invisible to other institutions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstitutionKind {
    Academic,
    Technical,
}

/// An independently administered school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub kind: InstitutionKind,
    pub license_start: NaiveDate,
    /// Last day the license is valid.
    pub license_end: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Institution {
    /// An institution is active while its license has not expired.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.license_end >= today
    }
}

/// Fields required to create a new institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstitution {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub kind: InstitutionKind,
    pub license_start: NaiveDate,
    pub license_end: NaiveDate,
}
