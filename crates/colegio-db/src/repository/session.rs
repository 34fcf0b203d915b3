//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use colegio_core::error::ColegioResult;
use colegio_core::models::session::{CreateSession, Session};
use colegio_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    session_key: String,
    institution_id: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    session_key: String,
    institution_id: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: Uuid) -> Result<Session, DbError> {
    Ok(Session {
        id,
        user_id: parse_uuid(&row.user_id, "user")?,
        session_key: row.session_key,
        institution_id: parse_opt_uuid(row.institution_id.as_deref(), "institution")?,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid(&self.record_id, "session")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            session_key: self.session_key,
            institution_id: parse_opt_uuid(self.institution_id.as_deref(), "institution")?,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count_where(&self, condition: &str, user_id: Option<Uuid>) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM session{condition} GROUP ALL"
            ))
            .bind(("user_id", user_id.map(|u| u.to_string())))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> ColegioResult<Session> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 user_id = $user_id, \
                 session_key = $session_key, \
                 institution_id = $institution_id, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("session_key", input.session_key))
            .bind(("institution_id", input.institution_id.map(|i| i.to_string())))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row_to_session(row, id)?)
    }

    async fn get_by_key(&self, session_key: &str) -> ColegioResult<Session> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE session_key = $session_key",
            )
            .bind(("session_key", session_key.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "by key".into(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn set_institution(
        &self,
        id: Uuid,
        institution_id: Option<Uuid>,
    ) -> ColegioResult<Session> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('session', $id) SET \
                 institution_id = $institution_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("institution_id", institution_id.map(|i| i.to_string())))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row_to_session(row, id)?)
    }

    async fn clear_institution_for_user(&self, user_id: Uuid) -> ColegioResult<u64> {
        let result = self
            .db
            .query(
                "UPDATE session SET institution_id = NONE \
                 WHERE user_id = $user_id AND institution_id != NONE",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> ColegioResult<u64> {
        let total = self
            .count_where(" WHERE user_id = $user_id", Some(user_id))
            .await?;

        self.db
            .query("DELETE session WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }

    async fn delete_all(&self) -> ColegioResult<u64> {
        let total = self.count_where("", None).await?;

        self.db
            .query("DELETE session")
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> ColegioResult<u64> {
        // Count expired sessions first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE expires_at < $now GROUP ALL",
            )
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE expires_at < $now")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }
}
