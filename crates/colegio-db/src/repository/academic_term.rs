//! SurrealDB implementation of [`AcademicTermRepository`].

use chrono::{DateTime, Utc};
use colegio_core::error::ColegioResult;
use colegio_core::models::academic_term::{AcademicTerm, CreateAcademicTerm};
use colegio_core::repository::AcademicTermRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TermRow {
    year: i64,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TermRowWithId {
    record_id: String,
    year: i64,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

fn to_year(raw: i64) -> Result<i32, DbError> {
    i32::try_from(raw).map_err(|_| DbError::Decode(format!("year out of range: {raw}")))
}

impl TermRow {
    fn into_term(self, id: Uuid) -> Result<AcademicTerm, DbError> {
        Ok(AcademicTerm {
            id,
            year: to_year(self.year)?,
            name: self.name,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

impl TermRowWithId {
    fn try_into_term(self) -> Result<AcademicTerm, DbError> {
        Ok(AcademicTerm {
            id: parse_uuid(&self.record_id, "term")?,
            year: to_year(self.year)?,
            name: self.name,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the AcademicTerm repository.
#[derive(Clone)]
pub struct SurrealAcademicTermRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAcademicTermRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AcademicTermRepository for SurrealAcademicTermRepository<C> {
    async fn create(&self, input: CreateAcademicTerm) -> ColegioResult<AcademicTerm> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('academic_term', $id) SET \
                 year = $year, name = $name, active = $active",
            )
            .bind(("id", id_str.clone()))
            .bind(("year", i64::from(input.year)))
            .bind(("name", input.name))
            .bind(("active", input.active))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TermRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "academic_term".into(),
            id: id_str,
        })?;

        Ok(row.into_term(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> ColegioResult<AcademicTerm> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('academic_term', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TermRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "academic_term".into(),
            id: id_str,
        })?;

        Ok(row.into_term(id)?)
    }

    async fn get_active(&self) -> ColegioResult<Option<AcademicTerm>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM academic_term \
                 WHERE active = true \
                 ORDER BY year DESC LIMIT 1",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TermRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_term())
            .transpose()?)
    }

    async fn list(&self) -> ColegioResult<Vec<AcademicTerm>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM academic_term \
                 ORDER BY year DESC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TermRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_term())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }
}
