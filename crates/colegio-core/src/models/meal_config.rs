//! Per-institution cafeteria configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default minimum interval between two registrations of the same
/// student: twenty hours, effectively once per day.
pub const DEFAULT_MINIMUM_INTERVAL_MINUTES: u32 = 1200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRegistrationConfig {
    pub institution_id: Uuid,
    /// Minimum minutes between two registrations of the same student.
    /// `120` allows breakfast and lunch; `1200` is once per day.
    pub minimum_interval_minutes: u32,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}
