//! Cafeteria configuration.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use colegio_core::models::meal_config::DEFAULT_MINIMUM_INTERVAL_MINUTES;

/// Configuration for the cafeteria services.
#[derive(Debug, Clone)]
pub struct ComedorConfig {
    /// Interval applied to institutions that have no configuration row
    /// yet (default: 1200 = 20 hours).
    pub default_interval_minutes: u32,
    /// Offset of the institutions' local time from UTC, used to decide
    /// which calendar day a meal was served on (default: -360, UTC-6).
    pub utc_offset_minutes: i32,
    /// Maximum number of unused benefits listed in a report
    /// (default: 250).
    pub unused_benefit_report_limit: usize,
}

impl Default for ComedorConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: DEFAULT_MINIMUM_INTERVAL_MINUTES,
            utc_offset_minutes: -360,
            unused_benefit_report_limit: 250,
        }
    }
}

impl ComedorConfig {
    /// Local calendar day of an instant.
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        (at + Duration::minutes(i64::from(self.utc_offset_minutes))).date_naive()
    }
}
