//! Integration tests for meal benefit, configuration and registration
//! repositories.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use colegio_core::models::meal_benefit::{CreateMealBenefit, MealKey};
use colegio_core::models::meal_registration::CreateMealRegistration;
use colegio_core::repository::{
    MealBenefitRepository, MealConfigRepository, MealRegistrationRepository, Pagination,
};
use colegio_core::{ColegioError, ScopedRepository, TenantContext};
use colegio_db::repository::{
    SurrealMealBenefitRepository, SurrealMealConfigRepository, SurrealMealRegistrationRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    colegio_db::run_migrations(&db).await.unwrap();
    db
}

fn key() -> MealKey {
    MealKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
}

fn benefit_for(key: MealKey) -> CreateMealBenefit {
    CreateMealBenefit {
        institution_id: Some(key.institution_id),
        term_id: key.term_id,
        student_id: key.student_id,
        granted_by: None,
    }
}

fn registration_at(key: MealKey, served_on: NaiveDate, hour: u32) -> CreateMealRegistration {
    let served_at = Utc
        .from_utc_datetime(&served_on.and_hms_opt(hour, 0, 0).unwrap());
    CreateMealRegistration {
        institution_id: Some(key.institution_id),
        term_id: key.term_id,
        student_id: key.student_id,
        served_on,
        served_at,
        note: None,
        recorded_by: None,
    }
}

// ---------------------------------------------------------------------------
// Benefits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn benefit_key_is_unique() {
    let db = setup().await;
    let repo = SurrealMealBenefitRepository::new(db);
    let k = key();

    let created = repo.create(benefit_for(k)).await.unwrap();
    assert!(created.active);
    assert_eq!(created.key(), k);

    let err = repo.create(benefit_for(k)).await.unwrap_err();
    assert!(matches!(err, ColegioError::AlreadyExists { .. }));
}

#[tokio::test]
async fn set_active_toggles_the_same_record() {
    let db = setup().await;
    let repo = SurrealMealBenefitRepository::new(db);
    let k = key();
    let admin = Uuid::new_v4();

    let created = repo.create(benefit_for(k)).await.unwrap();
    assert!(repo.is_active(k).await.unwrap());

    let revoked = repo.set_active(created.id, false, Some(admin)).await.unwrap();
    assert!(!revoked.active);
    assert_eq!(revoked.updated_by, Some(admin));
    assert!(!repo.is_active(k).await.unwrap());

    let found = repo.find(k).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);

    let err = repo
        .set_active(Uuid::new_v4(), true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));
}

#[tokio::test]
async fn benefit_listings_respect_term_and_activity() {
    let db = setup().await;
    let repo = SurrealMealBenefitRepository::new(db);
    let institution_id = Uuid::new_v4();
    let term_id = Uuid::new_v4();
    let students: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

    let mut ids = Vec::new();
    for student_id in &students {
        let b = repo
            .create(benefit_for(MealKey::new(institution_id, term_id, *student_id)))
            .await
            .unwrap();
        ids.push(b.id);
    }
    // Same student, other term.
    repo.create(benefit_for(MealKey::new(institution_id, Uuid::new_v4(), students[0])))
        .await
        .unwrap();
    repo.set_active(ids[2], false, None).await.unwrap();

    let active = repo.list_active(institution_id, term_id).await.unwrap();
    assert_eq!(active.len(), 2);

    let some = repo
        .list_for_students(institution_id, term_id, &students[1..])
        .await
        .unwrap();
    assert_eq!(some.len(), 2);

    let none = repo
        .list_for_students(institution_id, term_id, &[])
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn scoped_benefit_reads_are_owner_only() {
    let db = setup().await;
    let benefits = SurrealMealBenefitRepository::new(db);
    let mine = key();
    let theirs = key();
    let granted = benefits.create(benefit_for(mine)).await.unwrap();
    let foreign = benefits.create(benefit_for(theirs)).await.unwrap();

    let repo = ScopedRepository::new(benefits);
    let owner = TenantContext::Institution(mine.institution_id);

    let page = repo.list(&owner, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, granted.id);

    let fetched = repo.get(&owner, granted.id).await.unwrap();
    assert!(fetched.active);

    let err = repo.get(&owner, foreign.id).await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));

    let all = repo.list(&TenantContext::Global, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 2);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn config_is_created_lazily_once() {
    let db = setup().await;
    let repo = SurrealMealConfigRepository::new(db);
    let institution_id = Uuid::new_v4();

    assert!(repo.get(institution_id).await.unwrap().is_none());

    let created = repo.get_or_create(institution_id, 1200).await.unwrap();
    assert_eq!(created.minimum_interval_minutes, 1200);

    // A later default does not overwrite the stored value.
    let again = repo.get_or_create(institution_id, 60).await.unwrap();
    assert_eq!(again.minimum_interval_minutes, 1200);
}

#[tokio::test]
async fn set_interval_upserts_and_rejects_zero() {
    let db = setup().await;
    let repo = SurrealMealConfigRepository::new(db);
    let institution_id = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let set = repo
        .set_interval(institution_id, 120, Some(admin))
        .await
        .unwrap();
    assert_eq!(set.minimum_interval_minutes, 120);
    assert_eq!(set.updated_by, Some(admin));

    let changed = repo.set_interval(institution_id, 240, None).await.unwrap();
    assert_eq!(changed.minimum_interval_minutes, 240);
    assert_eq!(
        repo.get(institution_id).await.unwrap().unwrap().minimum_interval_minutes,
        240
    );

    let err = repo.set_interval(institution_id, 0, None).await.unwrap_err();
    assert!(matches!(err, ColegioError::Validation { .. }));
}

#[tokio::test]
async fn config_create_failure_is_reported() {
    let db = setup().await;
    // Tighten the stored constraint so the default itself is rejected.
    db.query(
        "DEFINE FIELD OVERWRITE minimum_interval_minutes ON TABLE meal_config \
         TYPE int ASSERT $value > 0 AND $value <= 600",
    )
    .await
    .unwrap()
    .check()
    .unwrap();
    let repo = SurrealMealConfigRepository::new(db);
    let institution_id = Uuid::new_v4();

    let err = repo.get_or_create(institution_id, 1200).await.unwrap_err();
    assert!(matches!(err, ColegioError::Database(_)), "got {err:?}");
    assert!(repo.get(institution_id).await.unwrap().is_none());

    let created = repo.get_or_create(institution_id, 300).await.unwrap();
    assert_eq!(created.minimum_interval_minutes, 300);
}

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_day_registrations_are_allowed() {
    let db = setup().await;
    let repo = SurrealMealRegistrationRepository::new(db);
    let k = key();
    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

    repo.append(registration_at(k, today, 13)).await.unwrap();
    repo.append(registration_at(k, today, 18)).await.unwrap();

    let last = repo.last_for(k).await.unwrap().unwrap();
    assert_eq!(last.served_at.format("%H").to_string(), "18");

    let rows = repo
        .list_in_range(k.institution_id, k.term_id, today, today)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn list_in_range_is_inclusive_and_ordered() {
    let db = setup().await;
    let repo = SurrealMealRegistrationRepository::new(db);
    let k = key();
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    for offset in [3_i64, 0, 1, 5] {
        repo.append(registration_at(k, start + Duration::days(offset), 12))
            .await
            .unwrap();
    }

    let rows = repo
        .list_in_range(k.institution_id, k.term_id, start, start + Duration::days(3))
        .await
        .unwrap();
    let days: Vec<NaiveDate> = rows.iter().map(|r| r.served_on).collect();
    assert_eq!(
        days,
        [start, start + Duration::days(1), start + Duration::days(3)]
    );

    assert!(repo.last_for(key()).await.unwrap().is_none());
}

#[tokio::test]
async fn scoped_registration_reads_are_owner_only() {
    let db = setup().await;
    let registrations = SurrealMealRegistrationRepository::new(db);
    let mine = key();
    let theirs = key();
    let day = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();

    let early = registrations.append(registration_at(mine, day, 11)).await.unwrap();
    let late = registrations.append(registration_at(mine, day, 17)).await.unwrap();
    let foreign = registrations.append(registration_at(theirs, day, 12)).await.unwrap();

    let repo = ScopedRepository::new(registrations);
    let owner = TenantContext::Institution(mine.institution_id);

    let page = repo.list(&owner, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
    let ids: Vec<Uuid> = page.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, [late.id, early.id]);

    assert_eq!(repo.get(&owner, early.id).await.unwrap().served_on, day);
    let err = repo.get(&owner, foreign.id).await.unwrap_err();
    assert!(matches!(err, ColegioError::NotFound { .. }));

    let err = repo
        .list(&TenantContext::Unresolved, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ColegioError::ScopeViolation { .. }));
}
