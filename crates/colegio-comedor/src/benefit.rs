//! Meal benefit registry.
//!
//! One record per (institution, term, student). Granting reactivates an
//! inactive record in place; revoking deactivates it. A second record
//! for the same key is never inserted.

use std::collections::HashSet;
use std::sync::Arc;

use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::meal_benefit::{CreateMealBenefit, MealBenefit, MealKey, SyncSummary};
use colegio_core::repository::MealBenefitRepository;
use colegio_core::{Actor, TenantContext};
use tracing::{debug, info};
use uuid::Uuid;

use crate::locks::KeyedLocks;

/// Benefit grant and revocation service.
///
/// Generic over the repository so that this crate has no dependency on
/// the database crate.
pub struct MealBenefitRegistry<B: MealBenefitRepository> {
    benefits: B,
    locks: Arc<KeyedLocks>,
}

impl<B: MealBenefitRepository> MealBenefitRegistry<B> {
    pub fn new(benefits: B) -> Self {
        Self::with_locks(benefits, Arc::new(KeyedLocks::new()))
    }

    /// Share a lock table with the registration engine.
    pub fn with_locks(benefits: B, locks: Arc<KeyedLocks>) -> Self {
        Self { benefits, locks }
    }

    pub fn repository(&self) -> &B {
        &self.benefits
    }

    /// Grant a benefit, reactivating the existing record if it was
    /// revoked.
    pub async fn grant(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        student_id: Uuid,
        actor: &Actor,
    ) -> ColegioResult<MealBenefit> {
        ctx.authorize(institution_id)?;
        let key = MealKey::new(institution_id, term_id, student_id);
        let _guard = self.locks.lock(key).await;
        self.grant_locked(key, actor).await
    }

    /// Deactivate a benefit. Fails with `NotFound` when none was ever
    /// granted.
    pub async fn revoke(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        student_id: Uuid,
        actor: &Actor,
    ) -> ColegioResult<MealBenefit> {
        ctx.authorize(institution_id)?;
        let key = MealKey::new(institution_id, term_id, student_id);
        let _guard = self.locks.lock(key).await;

        let existing = self
            .benefits
            .find(key)
            .await?
            .ok_or_else(|| ColegioError::not_found("meal_benefit", student_id))?;

        let revoked = self
            .benefits
            .set_active(existing.id, false, Some(actor.user_id))
            .await?;
        info!(
            institution_id = %institution_id,
            term_id = %term_id,
            student_id = %student_id,
            "Meal benefit revoked"
        );
        Ok(revoked)
    }

    pub async fn is_active(
        &self,
        institution_id: Uuid,
        term_id: Uuid,
        student_id: Uuid,
    ) -> ColegioResult<bool> {
        self.benefits
            .is_active(MealKey::new(institution_id, term_id, student_id))
            .await
    }

    /// Students holding an active benefit for the term.
    pub async fn active_student_ids(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
    ) -> ColegioResult<Vec<Uuid>> {
        ctx.authorize(institution_id)?;
        let active = self.benefits.list_active(institution_id, term_id).await?;
        Ok(active.into_iter().map(|b| b.student_id).collect())
    }

    /// Apply a checked selection: every candidate in `selected` ends up
    /// with an active benefit, every other candidate with none.
    /// Students outside `candidates` are left untouched.
    pub async fn sync_selection(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        candidates: &[Uuid],
        selected: &[Uuid],
        actor: &Actor,
    ) -> ColegioResult<SyncSummary> {
        ctx.authorize(institution_id)?;
        let selected: HashSet<Uuid> = selected.iter().copied().collect();
        let mut summary = SyncSummary::default();

        for &student_id in candidates {
            let key = MealKey::new(institution_id, term_id, student_id);
            let _guard = self.locks.lock(key).await;
            let existing = self.benefits.find(key).await?;

            match (existing, selected.contains(&student_id)) {
                (None, true) => {
                    self.create(key, actor).await?;
                    summary.created += 1;
                }
                (Some(benefit), true) if !benefit.active => {
                    self.benefits
                        .set_active(benefit.id, true, Some(actor.user_id))
                        .await?;
                    summary.activated += 1;
                }
                (Some(benefit), false) if benefit.active => {
                    self.benefits
                        .set_active(benefit.id, false, Some(actor.user_id))
                        .await?;
                    summary.deactivated += 1;
                }
                _ => {}
            }
        }

        info!(
            institution_id = %institution_id,
            term_id = %term_id,
            created = summary.created,
            activated = summary.activated,
            deactivated = summary.deactivated,
            "Meal benefit selection applied"
        );
        Ok(summary)
    }

    async fn grant_locked(&self, key: MealKey, actor: &Actor) -> ColegioResult<MealBenefit> {
        match self.benefits.find(key).await? {
            Some(existing) if existing.active => {
                debug!(student_id = %key.student_id, "Meal benefit already active");
                Err(ColegioError::DuplicateBenefit {
                    student_id: key.student_id,
                    term_id: key.term_id,
                })
            }
            Some(existing) => {
                let reactivated = self
                    .benefits
                    .set_active(existing.id, true, Some(actor.user_id))
                    .await?;
                info!(
                    institution_id = %key.institution_id,
                    student_id = %key.student_id,
                    "Meal benefit reactivated"
                );
                Ok(reactivated)
            }
            None => self.create(key, actor).await,
        }
    }

    async fn create(&self, key: MealKey, actor: &Actor) -> ColegioResult<MealBenefit> {
        let created = self
            .benefits
            .create(CreateMealBenefit {
                institution_id: Some(key.institution_id),
                term_id: key.term_id,
                student_id: key.student_id,
                granted_by: Some(actor.user_id),
            })
            .await
            .map_err(|e| match e {
                // Lost a race with another process writing the same key.
                ColegioError::AlreadyExists { .. } => ColegioError::DuplicateBenefit {
                    student_id: key.student_id,
                    term_id: key.term_id,
                },
                other => other,
            })?;
        info!(
            institution_id = %key.institution_id,
            student_id = %key.student_id,
            "Meal benefit granted"
        );
        Ok(created)
    }
}
