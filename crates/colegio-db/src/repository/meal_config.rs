//! SurrealDB implementation of [`MealConfigRepository`].
//!
//! The record id of each row is the owning institution's id, so there is
//! exactly one row per institution.

use chrono::{DateTime, Utc};
use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::meal_config::MealRegistrationConfig;
use colegio_core::repository::MealConfigRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::parse_opt_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MealConfigRow {
    minimum_interval_minutes: u32,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

fn row_to_config(
    row: MealConfigRow,
    institution_id: Uuid,
) -> Result<MealRegistrationConfig, DbError> {
    Ok(MealRegistrationConfig {
        institution_id,
        minimum_interval_minutes: row.minimum_interval_minutes,
        updated_at: row.updated_at,
        updated_by: parse_opt_uuid(row.updated_by.as_deref(), "user")?,
    })
}

/// SurrealDB implementation of the MealConfig repository.
#[derive(Clone)]
pub struct SurrealMealConfigRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMealConfigRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MealConfigRepository for SurrealMealConfigRepository<C> {
    async fn get(&self, institution_id: Uuid) -> ColegioResult<Option<MealRegistrationConfig>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('meal_config', $id)")
            .bind(("id", institution_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MealConfigRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row_to_config(row, institution_id))
            .transpose()?)
    }

    async fn get_or_create(
        &self,
        institution_id: Uuid,
        default_minutes: u32,
    ) -> ColegioResult<MealRegistrationConfig> {
        if let Some(existing) = self.get(institution_id).await? {
            return Ok(existing);
        }
        if default_minutes == 0 {
            return Err(ColegioError::Validation {
                message: "minimum interval must be positive".into(),
            });
        }

        let result = self
            .db
            .query(
                "CREATE type::record('meal_config', $id) SET \
                 institution_id = $id, \
                 minimum_interval_minutes = $minutes",
            )
            .bind(("id", institution_id.to_string()))
            .bind(("minutes", default_minutes))
            .await
            .map_err(DbError::from)?;

        let failure = match result.check() {
            Ok(mut created) => {
                let rows: Vec<MealConfigRow> = created.take(0).map_err(DbError::from)?;
                let row = rows.into_iter().next().ok_or_else(|| {
                    ColegioError::Internal("meal config CREATE returned no row".into())
                })?;
                info!(
                    institution_id = %institution_id,
                    minutes = default_minutes,
                    "Created default meal registration config"
                );
                return Ok(row_to_config(row, institution_id)?);
            }
            Err(e) => e,
        };

        // The record id is the institution, so a concurrent creator makes
        // our CREATE fail and leaves its row behind. Any other failure
        // leaves nothing to read back.
        match self.get(institution_id).await? {
            Some(existing) => {
                debug!(institution_id = %institution_id, error = %failure, "meal config create lost race");
                Ok(existing)
            }
            None => Err(DbError::Query(failure.to_string()).into()),
        }
    }

    async fn set_interval(
        &self,
        institution_id: Uuid,
        minutes: u32,
        updated_by: Option<Uuid>,
    ) -> ColegioResult<MealRegistrationConfig> {
        if minutes == 0 {
            return Err(ColegioError::Validation {
                message: "minimum interval must be positive".into(),
            });
        }

        let result = self
            .db
            .query(
                "UPSERT type::record('meal_config', $id) SET \
                 institution_id = $id, \
                 minimum_interval_minutes = $minutes, \
                 updated_by = $updated_by, \
                 updated_at = time::now()",
            )
            .bind(("id", institution_id.to_string()))
            .bind(("minutes", minutes))
            .bind(("updated_by", updated_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MealConfigRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "meal_config".into(),
            id: institution_id.to_string(),
        })?;

        info!(institution_id = %institution_id, minutes, "Meal registration interval updated");
        Ok(row_to_config(row, institution_id)?)
    }
}
