//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use colegio_core::error::ColegioResult;
use colegio_core::models::membership::{CreateMembership, MemberRole, Membership};
use colegio_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MembershipRowWithId {
    record_id: String,
    user_id: String,
    institution_id: String,
    role: String,
    created_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<MemberRole, DbError> {
    match s {
        "Admin" => Ok(MemberRole::Admin),
        "Teacher" => Ok(MemberRole::Teacher),
        "Staff" => Ok(MemberRole::Staff),
        other => Err(DbError::Decode(format!("unknown member role: {other}"))),
    }
}

fn role_to_string(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Admin => "Admin",
        MemberRole::Teacher => "Teacher",
        MemberRole::Staff => "Staff",
    }
}

impl MembershipRowWithId {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            id: parse_uuid(&self.record_id, "membership")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            institution_id: parse_uuid(&self.institution_id, "institution")?,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> ColegioResult<Membership> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('membership', $id) SET \
                 user_id = $user_id, \
                 institution_id = $institution_id, \
                 role = $role; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('membership', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("institution_id", input.institution_id.to_string()))
            .bind(("role", role_to_string(input.role)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        // Statement 0 is the CREATE, statement 1 re-reads it with its id.
        let rows: Vec<MembershipRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id_str,
        })?;

        Ok(row.try_into_membership()?)
    }

    async fn list_by_user(&self, user_id: Uuid) -> ColegioResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM membership \
                 WHERE user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_membership())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn delete(&self, id: Uuid) -> ColegioResult<()> {
        self.db
            .query("DELETE type::record('membership', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
