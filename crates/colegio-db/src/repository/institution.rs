//! SurrealDB implementation of [`InstitutionRepository`].

use chrono::{DateTime, Utc};
use colegio_core::error::ColegioResult;
use colegio_core::models::institution::{CreateInstitution, Institution, InstitutionKind};
use colegio_core::repository::{InstitutionRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, format_day, parse_day, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct InstitutionRow {
    name: String,
    email: String,
    phone: String,
    address: String,
    kind: String,
    license_start: String,
    license_end: String,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct InstitutionRowWithId {
    record_id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    kind: String,
    license_start: String,
    license_end: String,
    created_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<InstitutionKind, DbError> {
    match s {
        "Academic" => Ok(InstitutionKind::Academic),
        "Technical" => Ok(InstitutionKind::Technical),
        other => Err(DbError::Decode(format!("unknown institution kind: {other}"))),
    }
}

fn kind_to_string(kind: InstitutionKind) -> &'static str {
    match kind {
        InstitutionKind::Academic => "Academic",
        InstitutionKind::Technical => "Technical",
    }
}

impl InstitutionRow {
    fn into_institution(self, id: Uuid) -> Result<Institution, DbError> {
        Ok(Institution {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            kind: parse_kind(&self.kind)?,
            license_start: parse_day(&self.license_start)?,
            license_end: parse_day(&self.license_end)?,
            created_at: self.created_at,
        })
    }
}

impl InstitutionRowWithId {
    fn try_into_institution(self) -> Result<Institution, DbError> {
        let id = parse_uuid(&self.record_id, "institution")?;
        InstitutionRow {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            kind: self.kind,
            license_start: self.license_start,
            license_end: self.license_end,
            created_at: self.created_at,
        }
        .into_institution(id)
    }
}

/// SurrealDB implementation of the Institution repository.
#[derive(Clone)]
pub struct SurrealInstitutionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInstitutionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> InstitutionRepository for SurrealInstitutionRepository<C> {
    async fn create(&self, input: CreateInstitution) -> ColegioResult<Institution> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('institution', $id) SET \
                 name = $name, email = $email, \
                 phone = $phone, address = $address, \
                 kind = $kind, \
                 license_start = $license_start, \
                 license_end = $license_end",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("phone", input.phone.unwrap_or_default()))
            .bind(("address", input.address.unwrap_or_default()))
            .bind(("kind", kind_to_string(input.kind)))
            .bind(("license_start", format_day(input.license_start)))
            .bind(("license_end", format_day(input.license_end)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InstitutionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "institution".into(),
            id: id_str,
        })?;

        Ok(row.into_institution(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> ColegioResult<Institution> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('institution', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstitutionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "institution".into(),
            id: id_str,
        })?;

        Ok(row.into_institution(id)?)
    }

    async fn list(&self, pagination: Pagination) -> ColegioResult<PaginatedResult<Institution>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM institution GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM institution \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstitutionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_institution())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
