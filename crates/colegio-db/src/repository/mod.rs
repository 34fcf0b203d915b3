//! SurrealDB repository implementations.

mod academic_term;
mod institution;
mod meal_benefit;
mod meal_config;
mod meal_registration;
mod membership;
mod session;
mod student;

pub use academic_term::SurrealAcademicTermRepository;
pub use institution::SurrealInstitutionRepository;
pub use meal_benefit::SurrealMealBenefitRepository;
pub use meal_config::SurrealMealConfigRepository;
pub use meal_registration::SurrealMealRegistrationRepository;
pub use membership::SurrealMembershipRepository;
pub use session::SurrealSessionRepository;
pub use student::SurrealStudentRepository;

use chrono::NaiveDate;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| parse_uuid(s, what)).transpose()
}

pub(crate) fn parse_day(raw: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map_err(|e| DbError::Decode(format!("invalid date '{raw}': {e}")))
}

pub(crate) fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}
