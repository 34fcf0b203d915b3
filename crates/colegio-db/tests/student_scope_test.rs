//! Integration tests for the student repository behind the scoped gate.

use colegio_core::models::student::{CreateStudent, UpdateStudent};
use colegio_core::repository::{Pagination, StudentRepository};
use colegio_core::{ColegioError, ScopedRepository, TenantContext};
use colegio_db::repository::SurrealStudentRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> ScopedRepository<SurrealStudentRepository<Db>> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    colegio_db::run_migrations(&db).await.unwrap();
    ScopedRepository::new(SurrealStudentRepository::new(db))
}

fn student(identification: &str, surname: &str) -> CreateStudent {
    CreateStudent {
        institution_id: None,
        identification: identification.into(),
        given_names: "Ana".into(),
        first_surname: surname.into(),
        second_surname: "Mora".into(),
    }
}

#[tokio::test]
async fn create_stamps_institution_and_normalises_identification() {
    let repo = setup().await;
    let inst = Uuid::new_v4();
    let ctx = TenantContext::Institution(inst);

    let created = repo.create(&ctx, student("  1-2345-0678 ", "Solís")).await.unwrap();
    assert_eq!(created.institution_id, inst);
    assert_eq!(created.identification, "1-2345-0678");

    let by_ident = repo
        .store()
        .get_by_identification(inst, "1-2345-0678")
        .await
        .unwrap();
    assert_eq!(by_ident.id, created.id);

    let err = repo
        .store()
        .get_by_identification(Uuid::new_v4(), "1-2345-0678")
        .await
        .unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));
}

#[tokio::test]
async fn identification_is_unique_per_institution_only() {
    let repo = setup().await;
    let a = TenantContext::Institution(Uuid::new_v4());
    let b = TenantContext::Institution(Uuid::new_v4());

    repo.create(&a, student("A100", "Rojas")).await.unwrap();
    assert!(repo.create(&a, student("a100", "Rojas")).await.is_err());
    repo.create(&b, student("A100", "Rojas")).await.unwrap();
}

#[tokio::test]
async fn list_is_filtered_by_context_and_ordered_by_surname() {
    let repo = setup().await;
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    repo.create(&TenantContext::Institution(a), student("1", "Vargas"))
        .await
        .unwrap();
    repo.create(&TenantContext::Institution(a), student("2", "Araya"))
        .await
        .unwrap();
    repo.create(&TenantContext::Institution(b), student("3", "Brenes"))
        .await
        .unwrap();

    let page = repo
        .list(&TenantContext::Institution(a), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let surnames: Vec<&str> = page.items.iter().map(|s| s.first_surname.as_str()).collect();
    assert_eq!(surnames, ["Araya", "Vargas"]);

    let all = repo
        .list(&TenantContext::Global, Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let err = repo
        .list(&TenantContext::Unresolved, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ColegioError::ScopeViolation { .. }));
}

#[tokio::test]
async fn foreign_rows_cannot_be_read_updated_or_deleted() {
    let repo = setup().await;
    let owner = TenantContext::Institution(Uuid::new_v4());
    let other = TenantContext::Institution(Uuid::new_v4());

    let created = repo.create(&owner, student("X1", "Quesada")).await.unwrap();

    let err = repo.get(&other, created.id).await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));

    let patch = UpdateStudent {
        given_names: Some("Intruso".into()),
        ..Default::default()
    };
    let err = repo.update(&other, created.id, patch).await.unwrap_err();
    assert!(matches!(err, ColegioError::ScopeViolation { .. }));

    let err = repo.delete(&other, created.id).await.unwrap_err();
    assert!(matches!(err, ColegioError::ScopeViolation { .. }));

    // Untouched by the denied mutations.
    let unchanged = repo.get(&owner, created.id).await.unwrap();
    assert_eq!(unchanged.given_names, "Ana");
}

#[tokio::test]
async fn owner_and_global_can_mutate() {
    let repo = setup().await;
    let owner = TenantContext::Institution(Uuid::new_v4());

    let created = repo.create(&owner, student("Y1", "Chaves")).await.unwrap();
    let updated = repo
        .update(
            &owner,
            created.id,
            UpdateStudent {
                second_surname: Some("Jiménez".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.second_surname, "Jiménez");
    assert_eq!(updated.first_surname, "Chaves");

    repo.delete(&TenantContext::Global, created.id).await.unwrap();
    let err = repo.get(&owner, created.id).await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));
}

#[tokio::test]
async fn missing_rows_report_not_found() {
    let repo = setup().await;
    let ctx = TenantContext::Institution(Uuid::new_v4());

    let err = repo
        .update(&ctx, Uuid::new_v4(), UpdateStudent::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));

    let err = repo.delete(&ctx, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));
}
