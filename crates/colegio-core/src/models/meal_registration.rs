//! Meal registration events: an append-only log of meals served.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::meal_benefit::MealKey;
use crate::scope::InstitutionOwned;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRegistration {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub term_id: Uuid,
    pub student_id: Uuid,
    /// Local calendar day the meal was served, used for reporting.
    pub served_on: NaiveDate,
    pub served_at: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
}

impl MealRegistration {
    pub fn key(&self) -> MealKey {
        MealKey::new(self.institution_id, self.term_id, self.student_id)
    }
}

impl InstitutionOwned for MealRegistration {
    fn institution_id(&self) -> Uuid {
        self.institution_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMealRegistration {
    pub institution_id: Option<Uuid>,
    pub term_id: Uuid,
    pub student_id: Uuid,
    pub served_on: NaiveDate,
    pub served_at: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
}

/// Registrations grouped by served day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMealCount {
    pub day: NaiveDate,
    pub registrations: u64,
    pub distinct_students: u64,
}
