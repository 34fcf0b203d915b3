//! Integration tests for session maintenance.

use chrono::{Duration, Utc};
use colegio_core::ColegioError;
use colegio_core::models::session::CreateSession;
use colegio_core::repository::SessionRepository;
use colegio_db::repository::SurrealSessionRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealSessionRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    colegio_db::run_migrations(&db).await.unwrap();
    SurrealSessionRepository::new(db)
}

fn session(user_id: Uuid, key: &str, institution_id: Option<Uuid>, hours: i64) -> CreateSession {
    CreateSession {
        user_id,
        session_key: key.into(),
        institution_id,
        expires_at: Utc::now() + Duration::hours(hours),
    }
}

#[tokio::test]
async fn create_get_and_set_institution() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let inst = Uuid::new_v4();

    let created = repo.create(session(user_id, "k1", None, 8)).await.unwrap();
    assert!(created.institution_id.is_none());

    let updated = repo.set_institution(created.id, Some(inst)).await.unwrap();
    assert_eq!(updated.institution_id, Some(inst));

    let fetched = repo.get_by_key("k1").await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.institution_id, Some(inst));

    let err = repo.get_by_key("missing").await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));
}

#[tokio::test]
async fn clear_institution_for_user_counts_changed_sessions() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let other = Uuid::new_v4();
    let inst = Uuid::new_v4();

    repo.create(session(user_id, "a", Some(inst), 8)).await.unwrap();
    repo.create(session(user_id, "b", Some(inst), 8)).await.unwrap();
    repo.create(session(user_id, "c", None, 8)).await.unwrap();
    repo.create(session(other, "d", Some(inst), 8)).await.unwrap();

    assert_eq!(repo.clear_institution_for_user(user_id).await.unwrap(), 2);
    assert!(repo.get_by_key("a").await.unwrap().institution_id.is_none());
    assert_eq!(repo.get_by_key("d").await.unwrap().institution_id, Some(inst));
    assert_eq!(repo.clear_institution_for_user(user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_for_user_and_delete_all() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();

    repo.create(session(user_id, "a", None, 8)).await.unwrap();
    repo.create(session(user_id, "b", None, 8)).await.unwrap();
    repo.create(session(Uuid::new_v4(), "c", None, 8)).await.unwrap();

    assert_eq!(repo.delete_for_user(user_id).await.unwrap(), 2);
    assert!(repo.get_by_key("a").await.is_err());
    assert_eq!(repo.delete_all().await.unwrap(), 1);
    assert_eq!(repo.delete_all().await.unwrap(), 0);
}

#[tokio::test]
async fn cleanup_expired_removes_only_expired() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();

    repo.create(session(user_id, "old", None, -1)).await.unwrap();
    repo.create(session(user_id, "live", None, 8)).await.unwrap();

    assert_eq!(repo.cleanup_expired(Utc::now()).await.unwrap(), 1);
    assert!(repo.get_by_key("old").await.is_err());
    assert!(repo.get_by_key("live").await.is_ok());
}
