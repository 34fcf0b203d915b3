//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Institution-owned repositories
//! take the owning `institution_id` explicitly; callers obtain it from a
//! [`TenantContext`](crate::tenant::TenantContext) that has already been
//! authorised.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::ColegioResult;
use crate::models::{
    academic_term::{AcademicTerm, CreateAcademicTerm},
    institution::{CreateInstitution, Institution},
    meal_benefit::{CreateMealBenefit, MealBenefit, MealKey},
    meal_config::MealRegistrationConfig,
    meal_registration::{CreateMealRegistration, MealRegistration},
    membership::{CreateMembership, Membership},
    session::{CreateSession, Session},
    student::{CreateStudent, Student},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Institutions, memberships and terms (global scope)
// ---------------------------------------------------------------------------

pub trait InstitutionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateInstitution,
    ) -> impl Future<Output = ColegioResult<Institution>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ColegioResult<Institution>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ColegioResult<PaginatedResult<Institution>>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = ColegioResult<Membership>> + Send;
    fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = ColegioResult<Vec<Membership>>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = ColegioResult<()>> + Send;
}

pub trait AcademicTermRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAcademicTerm,
    ) -> impl Future<Output = ColegioResult<AcademicTerm>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ColegioResult<AcademicTerm>> + Send;
    /// The term flagged as current, if any.
    fn get_active(&self) -> impl Future<Output = ColegioResult<Option<AcademicTerm>>> + Send;
    /// All terms, newest year first.
    fn list(&self) -> impl Future<Output = ColegioResult<Vec<AcademicTerm>>> + Send;
}

// ---------------------------------------------------------------------------
// Students (institution scope)
// ---------------------------------------------------------------------------

pub trait StudentRepository: Send + Sync {
    /// `input.institution_id` must already be stamped.
    fn create(&self, input: CreateStudent) -> impl Future<Output = ColegioResult<Student>> + Send;
    fn get_by_id(
        &self,
        institution_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ColegioResult<Student>> + Send;
    /// Lookup by normalised identification within one institution.
    fn get_by_identification(
        &self,
        institution_id: Uuid,
        identification: &str,
    ) -> impl Future<Output = ColegioResult<Student>> + Send;
}

// ---------------------------------------------------------------------------
// Cafeteria (institution scope)
// ---------------------------------------------------------------------------

pub trait MealBenefitRepository: Send + Sync {
    /// The single record for a key, active or not.
    fn find(&self, key: MealKey) -> impl Future<Output = ColegioResult<Option<MealBenefit>>> + Send;
    /// Insert a new record. Fails with `AlreadyExists` when the key is
    /// taken.
    fn create(
        &self,
        input: CreateMealBenefit,
    ) -> impl Future<Output = ColegioResult<MealBenefit>> + Send;
    /// Toggle `active` on an existing record and stamp the updater.
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
        updated_by: Option<Uuid>,
    ) -> impl Future<Output = ColegioResult<MealBenefit>> + Send;
    fn is_active(&self, key: MealKey) -> impl Future<Output = ColegioResult<bool>> + Send;
    /// Records (active or not) for the given students.
    fn list_for_students(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
        student_ids: &[Uuid],
    ) -> impl Future<Output = ColegioResult<Vec<MealBenefit>>> + Send;
    fn list_active(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
    ) -> impl Future<Output = ColegioResult<Vec<MealBenefit>>> + Send;
}

pub trait MealConfigRepository: Send + Sync {
    fn get(
        &self,
        institution_id: Uuid,
    ) -> impl Future<Output = ColegioResult<Option<MealRegistrationConfig>>> + Send;
    /// Return the institution's row, creating it with `default_minutes`
    /// on first reference.
    fn get_or_create(
        &self,
        institution_id: Uuid,
        default_minutes: u32,
    ) -> impl Future<Output = ColegioResult<MealRegistrationConfig>> + Send;
    fn set_interval(
        &self,
        institution_id: Uuid,
        minutes: u32,
        updated_by: Option<Uuid>,
    ) -> impl Future<Output = ColegioResult<MealRegistrationConfig>> + Send;
}

/// Append-only: there are no update or delete operations here. Admin
/// corrections go through the scoped gate.
pub trait MealRegistrationRepository: Send + Sync {
    /// `input.institution_id` must already be stamped.
    fn append(
        &self,
        input: CreateMealRegistration,
    ) -> impl Future<Output = ColegioResult<MealRegistration>> + Send;
    /// Most recent event for a key.
    fn last_for(
        &self,
        key: MealKey,
    ) -> impl Future<Output = ColegioResult<Option<MealRegistration>>> + Send;
    /// Events served between `from` and `to` (inclusive days), oldest
    /// first.
    fn list_in_range(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = ColegioResult<Vec<MealRegistration>>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = ColegioResult<Session>> + Send;
    fn get_by_key(&self, session_key: &str) -> impl Future<Output = ColegioResult<Session>> + Send;
    /// Persist (or clear) the institution a session points at.
    fn set_institution(
        &self,
        id: Uuid,
        institution_id: Option<Uuid>,
    ) -> impl Future<Output = ColegioResult<Session>> + Send;
    /// Strip the active institution from every session of a user.
    /// Returns the number of sessions changed.
    fn clear_institution_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = ColegioResult<u64>> + Send;
    fn delete_for_user(&self, user_id: Uuid) -> impl Future<Output = ColegioResult<u64>> + Send;
    fn delete_all(&self) -> impl Future<Output = ColegioResult<u64>> + Send;
    /// Remove sessions that expired before `now`.
    fn cleanup_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = ColegioResult<u64>> + Send;
}
