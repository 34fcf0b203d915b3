//! SurrealDB implementation of [`MealBenefitRepository`] and the meal
//! benefit [`ScopedStore`].
//!
//! The scoped store is read-only. Grants and revocations go through the
//! benefit registry, which holds the per-key lock and never removes a
//! record.

use chrono::{DateTime, Utc};
use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::meal_benefit::{CreateMealBenefit, MealBenefit, MealKey};
use colegio_core::repository::{MealBenefitRepository, PaginatedResult, Pagination};
use colegio_core::scope::ScopedStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for statements that return the record itself.
#[derive(Debug, SurrealValue)]
struct MealBenefitRow {
    institution_id: String,
    term_id: String,
    student_id: String,
    active: bool,
    granted_at: DateTime<Utc>,
    granted_by: Option<String>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

fn row_to_benefit(row: MealBenefitRow, id: Uuid) -> Result<MealBenefit, DbError> {
    Ok(MealBenefit {
        id,
        institution_id: parse_uuid(&row.institution_id, "institution")?,
        term_id: parse_uuid(&row.term_id, "term")?,
        student_id: parse_uuid(&row.student_id, "student")?,
        active: row.active,
        granted_at: row.granted_at,
        granted_by: parse_opt_uuid(row.granted_by.as_deref(), "user")?,
        updated_at: row.updated_at,
        updated_by: parse_opt_uuid(row.updated_by.as_deref(), "user")?,
    })
}

#[derive(Debug, SurrealValue)]
struct MealBenefitRowWithId {
    record_id: String,
    institution_id: String,
    term_id: String,
    student_id: String,
    active: bool,
    granted_at: DateTime<Utc>,
    granted_by: Option<String>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl MealBenefitRowWithId {
    fn try_into_benefit(self) -> Result<MealBenefit, DbError> {
        Ok(MealBenefit {
            id: parse_uuid(&self.record_id, "meal_benefit")?,
            institution_id: parse_uuid(&self.institution_id, "institution")?,
            term_id: parse_uuid(&self.term_id, "term")?,
            student_id: parse_uuid(&self.student_id, "student")?,
            active: self.active,
            granted_at: self.granted_at,
            granted_by: parse_opt_uuid(self.granted_by.as_deref(), "user")?,
            updated_at: self.updated_at,
            updated_by: parse_opt_uuid(self.updated_by.as_deref(), "user")?,
        })
    }
}

fn collect_benefits(rows: Vec<MealBenefitRowWithId>) -> Result<Vec<MealBenefit>, DbError> {
    rows.into_iter().map(|r| r.try_into_benefit()).collect()
}

/// SurrealDB implementation of the MealBenefit repository.
///
/// Behind a [`ScopedRepository`](colegio_core::ScopedRepository) it only
/// lists and reads; deleting a benefit through the gate does not compile:
///
/// ```compile_fail
/// use colegio_core::{ScopedRepository, TenantContext};
/// use colegio_db::repository::SurrealMealBenefitRepository;
/// use surrealdb::engine::local::Db;
/// use uuid::Uuid;
///
/// async fn drop_through_gate(
///     gate: ScopedRepository<SurrealMealBenefitRepository<Db>>,
///     id: Uuid,
/// ) {
///     let _ = gate.delete(&TenantContext::Global, id).await;
/// }
/// ```
#[derive(Clone)]
pub struct SurrealMealBenefitRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMealBenefitRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_by_id(&self, id: Uuid) -> Result<Option<MealBenefit>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('meal_benefit', $id)",
            )
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<MealBenefitRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.try_into_benefit())
            .transpose()
    }
}

impl<C: Connection> MealBenefitRepository for SurrealMealBenefitRepository<C> {
    async fn find(&self, key: MealKey) -> ColegioResult<Option<MealBenefit>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM meal_benefit \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id AND student_id = $student_id \
                 LIMIT 1",
            )
            .bind(("institution_id", key.institution_id.to_string()))
            .bind(("term_id", key.term_id.to_string()))
            .bind(("student_id", key.student_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealBenefitRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_benefit())
            .transpose()?)
    }

    async fn create(&self, input: CreateMealBenefit) -> ColegioResult<MealBenefit> {
        let institution_id = input.institution_id.ok_or_else(|| ColegioError::Validation {
            message: "meal benefit requires an institution".into(),
        })?;
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('meal_benefit', $id) SET \
                 institution_id = $institution_id, \
                 term_id = $term_id, \
                 student_id = $student_id, \
                 active = true, \
                 granted_by = $granted_by, \
                 updated_by = $granted_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("institution_id", institution_id.to_string()))
            .bind(("term_id", input.term_id.to_string()))
            .bind(("student_id", input.student_id.to_string()))
            .bind(("granted_by", input.granted_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        if let Err(e) = result.check() {
            // The unique key index rejects a second record per key.
            let key = MealKey::new(institution_id, input.term_id, input.student_id);
            if self.find(key).await?.is_some() {
                debug!(student_id = %input.student_id, "meal benefit key already taken");
                return Err(ColegioError::AlreadyExists {
                    entity: "meal_benefit".into(),
                });
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        let benefit = self.select_by_id(id).await?.ok_or_else(|| DbError::NotFound {
            entity: "meal_benefit".into(),
            id: id_str,
        })?;
        Ok(benefit)
    }

    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        updated_by: Option<Uuid>,
    ) -> ColegioResult<MealBenefit> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('meal_benefit', $id) SET \
                 active = $active, \
                 updated_by = $updated_by, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("active", active))
            .bind(("updated_by", updated_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MealBenefitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "meal_benefit".into(),
            id: id_str,
        })?;

        Ok(row_to_benefit(row, id)?)
    }

    async fn is_active(&self, key: MealKey) -> ColegioResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM meal_benefit \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id AND student_id = $student_id \
                 AND active = true GROUP ALL",
            )
            .bind(("institution_id", key.institution_id.to_string()))
            .bind(("term_id", key.term_id.to_string()))
            .bind(("student_id", key.student_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn list_for_students(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
        student_ids: &[Uuid],
    ) -> ColegioResult<Vec<MealBenefit>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = student_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM meal_benefit \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id AND student_id IN $student_ids",
            )
            .bind(("institution_id", institution_id.to_string()))
            .bind(("term_id", term_id.to_string()))
            .bind(("student_ids", ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealBenefitRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect_benefits(rows)?)
    }

    async fn list_active(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
    ) -> ColegioResult<Vec<MealBenefit>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM meal_benefit \
                 WHERE institution_id = $institution_id \
                 AND term_id = $term_id AND active = true \
                 ORDER BY granted_at ASC",
            )
            .bind(("institution_id", institution_id.to_string()))
            .bind(("term_id", term_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealBenefitRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect_benefits(rows)?)
    }
}

impl<C: Connection> ScopedStore for SurrealMealBenefitRepository<C> {
    type Entity = MealBenefit;

    const ENTITY: &'static str = "meal_benefit";

    async fn list(
        &self,
        institution_id: Option<Uuid>,
        pagination: Pagination,
    ) -> ColegioResult<PaginatedResult<MealBenefit>> {
        let filter = if institution_id.is_some() {
            " WHERE institution_id = $institution_id"
        } else {
            ""
        };
        let owner = institution_id.map(|i| i.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM meal_benefit{filter} GROUP ALL"
            ))
            .bind(("institution_id", owner.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM meal_benefit{filter} \
                 ORDER BY granted_at DESC LIMIT $limit START $offset"
            ))
            .bind(("institution_id", owner))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealBenefitRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(PaginatedResult {
            items: collect_benefits(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn lookup(&self, id: Uuid) -> ColegioResult<Option<MealBenefit>> {
        Ok(self.select_by_id(id).await?)
    }
}
