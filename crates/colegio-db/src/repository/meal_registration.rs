//! SurrealDB implementation of [`MealRegistrationRepository`] and the
//! meal registration [`ScopedStore`].
//!
//! Registrations are an append-only log. The only write is
//! [`MealRegistrationRepository::append`], called by the eligibility
//! engine under the key lock; the scoped store serves reads only.

use chrono::{DateTime, NaiveDate, Utc};
use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::meal_benefit::MealKey;
use colegio_core::models::meal_registration::{CreateMealRegistration, MealRegistration};
use colegio_core::repository::{MealRegistrationRepository, PaginatedResult, Pagination};
use colegio_core::scope::ScopedStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, format_day, parse_day, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MealRegistrationRow {
    institution_id: String,
    term_id: String,
    student_id: String,
    served_on: String,
    served_at: DateTime<Utc>,
    note: Option<String>,
    recorded_by: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct MealRegistrationRowWithId {
    record_id: String,
    institution_id: String,
    term_id: String,
    student_id: String,
    served_on: String,
    served_at: DateTime<Utc>,
    note: Option<String>,
    recorded_by: Option<String>,
}

fn row_to_registration(row: MealRegistrationRow, id: Uuid) -> Result<MealRegistration, DbError> {
    Ok(MealRegistration {
        id,
        institution_id: parse_uuid(&row.institution_id, "institution")?,
        term_id: parse_uuid(&row.term_id, "term")?,
        student_id: parse_uuid(&row.student_id, "student")?,
        served_on: parse_day(&row.served_on)?,
        served_at: row.served_at,
        note: row.note,
        recorded_by: parse_opt_uuid(row.recorded_by.as_deref(), "user")?,
    })
}

impl MealRegistrationRowWithId {
    fn try_into_registration(self) -> Result<MealRegistration, DbError> {
        Ok(MealRegistration {
            id: parse_uuid(&self.record_id, "meal_registration")?,
            institution_id: parse_uuid(&self.institution_id, "institution")?,
            term_id: parse_uuid(&self.term_id, "term")?,
            student_id: parse_uuid(&self.student_id, "student")?,
            served_on: parse_day(&self.served_on)?,
            served_at: self.served_at,
            note: self.note,
            recorded_by: parse_opt_uuid(self.recorded_by.as_deref(), "user")?,
        })
    }
}

fn collect_registrations(
    rows: Vec<MealRegistrationRowWithId>,
) -> Result<Vec<MealRegistration>, DbError> {
    rows.into_iter().map(|r| r.try_into_registration()).collect()
}

/// SurrealDB implementation of the MealRegistration repository.
///
/// Behind a [`ScopedRepository`](colegio_core::ScopedRepository) it only
/// lists and reads; creating an event through the gate does not compile:
///
/// ```compile_fail
/// use colegio_core::models::meal_registration::CreateMealRegistration;
/// use colegio_core::{ScopedRepository, TenantContext};
/// use colegio_db::repository::SurrealMealRegistrationRepository;
/// use surrealdb::engine::local::Db;
///
/// async fn append_through_gate(
///     gate: ScopedRepository<SurrealMealRegistrationRepository<Db>>,
///     draft: CreateMealRegistration,
/// ) {
///     let _ = gate.create(&TenantContext::Global, draft).await;
/// }
/// ```
#[derive(Clone)]
pub struct SurrealMealRegistrationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMealRegistrationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MealRegistrationRepository for SurrealMealRegistrationRepository<C> {
    async fn append(&self, input: CreateMealRegistration) -> ColegioResult<MealRegistration> {
        let institution_id = input.institution_id.ok_or_else(|| ColegioError::Validation {
            message: "meal registration requires an institution".into(),
        })?;
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('meal_registration', $id) SET \
                 institution_id = $institution_id, \
                 term_id = $term_id, \
                 student_id = $student_id, \
                 served_on = $served_on, \
                 served_at = $served_at, \
                 note = $note, \
                 recorded_by = $recorded_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("institution_id", institution_id.to_string()))
            .bind(("term_id", input.term_id.to_string()))
            .bind(("student_id", input.student_id.to_string()))
            .bind(("served_on", format_day(input.served_on)))
            .bind(("served_at", input.served_at))
            .bind(("note", input.note))
            .bind(("recorded_by", input.recorded_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MealRegistrationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "meal_registration".into(),
            id: id_str,
        })?;

        Ok(row_to_registration(row, id)?)
    }

    async fn last_for(&self, key: MealKey) -> ColegioResult<Option<MealRegistration>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM meal_registration \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id AND student_id = $student_id \
                 ORDER BY served_at DESC LIMIT 1",
            )
            .bind(("institution_id", key.institution_id.to_string()))
            .bind(("term_id", key.term_id.to_string()))
            .bind(("student_id", key.student_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealRegistrationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_registration())
            .transpose()?)
    }

    async fn list_in_range(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ColegioResult<Vec<MealRegistration>> {
        // `YYYY-MM-DD` strings sort the same way as the days they encode.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM meal_registration \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id \
                 AND served_on >= $from AND served_on <= $to \
                 ORDER BY served_at ASC",
            )
            .bind(("institution_id", institution_id.to_string()))
            .bind(("term_id", term_id.to_string()))
            .bind(("from", format_day(from)))
            .bind(("to", format_day(to)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealRegistrationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect_registrations(rows)?)
    }
}

impl<C: Connection> ScopedStore for SurrealMealRegistrationRepository<C> {
    type Entity = MealRegistration;

    const ENTITY: &'static str = "meal_registration";

    async fn list(
        &self,
        institution_id: Option<Uuid>,
        pagination: Pagination,
    ) -> ColegioResult<PaginatedResult<MealRegistration>> {
        let filter = if institution_id.is_some() {
            " WHERE institution_id = $institution_id"
        } else {
            ""
        };
        let owner = institution_id.map(|i| i.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM meal_registration{filter} GROUP ALL"
            ))
            .bind(("institution_id", owner.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM meal_registration{filter} \
                 ORDER BY served_at DESC LIMIT $limit START $offset"
            ))
            .bind(("institution_id", owner))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealRegistrationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(PaginatedResult {
            items: collect_registrations(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn lookup(&self, id: Uuid) -> ColegioResult<Option<MealRegistration>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('meal_registration', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealRegistrationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| row_to_registration(r, id))
            .transpose()?)
    }
}
