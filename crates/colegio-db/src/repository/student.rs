//! SurrealDB implementation of [`StudentRepository`] and the student
//! [`ScopedStore`].

use chrono::{DateTime, Utc};
use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::student::{CreateStudent, Student, UpdateStudent, normalize_identification};
use colegio_core::repository::{PaginatedResult, Pagination, StudentRepository};
use colegio_core::scope::{ScopedStore, ScopedWriteStore};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct StudentRow {
    institution_id: String,
    identification: String,
    given_names: String,
    first_surname: String,
    second_surname: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct StudentRowWithId {
    record_id: String,
    institution_id: String,
    identification: String,
    given_names: String,
    first_surname: String,
    second_surname: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_student(row: StudentRow, id: Uuid) -> Result<Student, DbError> {
    Ok(Student {
        id,
        institution_id: parse_uuid(&row.institution_id, "institution")?,
        identification: row.identification,
        given_names: row.given_names,
        first_surname: row.first_surname,
        second_surname: row.second_surname,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl StudentRowWithId {
    fn try_into_student(self) -> Result<Student, DbError> {
        Ok(Student {
            id: parse_uuid(&self.record_id, "student")?,
            institution_id: parse_uuid(&self.institution_id, "institution")?,
            identification: self.identification,
            given_names: self.given_names,
            first_surname: self.first_surname,
            second_surname: self.second_surname,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `WHERE` clause restricting a statement to the owning institution, or
/// nothing for unrestricted access.
fn owner_clause(institution_id: Option<Uuid>) -> &'static str {
    if institution_id.is_some() {
        " WHERE institution_id = $institution_id"
    } else {
        ""
    }
}

/// SurrealDB implementation of the Student repository.
#[derive(Clone)]
pub struct SurrealStudentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStudentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_row(&self, id: Uuid) -> Result<Option<Student>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('student', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<StudentRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row_to_student(row, id))
            .transpose()
    }
}

impl<C: Connection> StudentRepository for SurrealStudentRepository<C> {
    async fn create(&self, input: CreateStudent) -> ColegioResult<Student> {
        let institution_id = input.institution_id.ok_or_else(|| ColegioError::Validation {
            message: "student requires an institution".into(),
        })?;
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('student', $id) SET \
                 institution_id = $institution_id, \
                 identification = $identification, \
                 given_names = $given_names, \
                 first_surname = $first_surname, \
                 second_surname = $second_surname",
            )
            .bind(("id", id_str.clone()))
            .bind(("institution_id", institution_id.to_string()))
            .bind((
                "identification",
                normalize_identification(&input.identification),
            ))
            .bind(("given_names", input.given_names))
            .bind(("first_surname", input.first_surname))
            .bind(("second_surname", input.second_surname))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<StudentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "student".into(),
            id: id_str,
        })?;

        Ok(row_to_student(row, id)?)
    }

    async fn get_by_id(&self, institution_id: Uuid, id: Uuid) -> ColegioResult<Student> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('student', $id) \
                 WHERE institution_id = $institution_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("institution_id", institution_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "student".into(),
            id: id_str,
        })?;

        Ok(row_to_student(row, id)?)
    }

    async fn get_by_identification(
        &self,
        institution_id: Uuid,
        identification: &str,
    ) -> ColegioResult<Student> {
        let normalized = normalize_identification(identification);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM student \
                 WHERE institution_id = $institution_id \
                 AND identification = $identification",
            )
            .bind(("institution_id", institution_id.to_string()))
            .bind(("identification", normalized.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "student".into(),
            id: format!("identification={normalized}"),
        })?;

        Ok(row.try_into_student()?)
    }
}

impl<C: Connection> ScopedStore for SurrealStudentRepository<C> {
    type Entity = Student;

    const ENTITY: &'static str = "student";

    async fn list(
        &self,
        institution_id: Option<Uuid>,
        pagination: Pagination,
    ) -> ColegioResult<PaginatedResult<Student>> {
        let filter = owner_clause(institution_id);
        let owner = institution_id.map(|i| i.to_string());

        let mut count_result = self
            .db
            .query(format!("SELECT count() AS total FROM student{filter} GROUP ALL"))
            .bind(("institution_id", owner.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM student{filter} \
                 ORDER BY first_surname ASC, second_surname ASC, given_names ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("institution_id", owner))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_student())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn lookup(&self, id: Uuid) -> ColegioResult<Option<Student>> {
        Ok(self.find_row(id).await?)
    }
}

impl<C: Connection> ScopedWriteStore for SurrealStudentRepository<C> {
    type Create = CreateStudent;
    type Update = UpdateStudent;

    async fn insert(&self, input: CreateStudent) -> ColegioResult<Student> {
        StudentRepository::create(self, input).await
    }

    async fn update_owned(
        &self,
        institution_id: Option<Uuid>,
        id: Uuid,
        input: UpdateStudent,
    ) -> ColegioResult<Option<Student>> {
        let mut sets = Vec::new();
        if input.identification.is_some() {
            sets.push("identification = $identification");
        }
        if input.given_names.is_some() {
            sets.push("given_names = $given_names");
        }
        if input.first_surname.is_some() {
            sets.push("first_surname = $first_surname");
        }
        if input.second_surname.is_some() {
            sets.push("second_surname = $second_surname");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('student', $id) SET {}{}",
            sets.join(", "),
            owner_clause(institution_id)
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("institution_id", institution_id.map(|i| i.to_string())));

        if let Some(identification) = input.identification {
            builder = builder.bind(("identification", normalize_identification(&identification)));
        }
        if let Some(given_names) = input.given_names {
            builder = builder.bind(("given_names", given_names));
        }
        if let Some(first_surname) = input.first_surname {
            builder = builder.bind(("first_surname", first_surname));
        }
        if let Some(second_surname) = input.second_surname {
            builder = builder.bind(("second_surname", second_surname));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<StudentRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row_to_student(row, id))
            .transpose()?)
    }

    async fn delete_owned(&self, institution_id: Option<Uuid>, id: Uuid) -> ColegioResult<bool> {
        let query = format!(
            "DELETE type::record('student', $id){} RETURN BEFORE",
            owner_clause(institution_id)
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("institution_id", institution_id.map(|i| i.to_string())))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<StudentRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}
