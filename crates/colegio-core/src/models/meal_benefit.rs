//! Meal benefit domain model.
//!
//! A benefit authorises a student to receive subsidised meals at an
//! institution during one academic term. There is at most one benefit
//! record per (institution, term, student); revocation and re-grant
//! toggle `active` on that same record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::InstitutionOwned;

/// The (institution, term, student) triple that partitions benefits and
/// registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MealKey {
    pub institution_id: Uuid,
    pub term_id: Uuid,
    pub student_id: Uuid,
}

impl MealKey {
    pub fn new(institution_id: Uuid, term_id: Uuid, student_id: Uuid) -> Self {
        Self {
            institution_id,
            term_id,
            student_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealBenefit {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub term_id: Uuid,
    pub student_id: Uuid,
    pub active: bool,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl MealBenefit {
    pub fn key(&self) -> MealKey {
        MealKey::new(self.institution_id, self.term_id, self.student_id)
    }
}

impl InstitutionOwned for MealBenefit {
    fn institution_id(&self) -> Uuid {
        self.institution_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMealBenefit {
    pub institution_id: Option<Uuid>,
    pub term_id: Uuid,
    pub student_id: Uuid,
    pub granted_by: Option<Uuid>,
}

/// Outcome of applying a checked selection of students to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub created: u32,
    pub activated: u32,
    pub deactivated: u32,
}
