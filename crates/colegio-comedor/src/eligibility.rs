//! Meal registration eligibility engine.
//!
//! Each (institution, term, student) key is either `Eligible` or
//! `JustRegistered` until the institution's minimum interval has elapsed
//! since its last registration. The read of the last event and the
//! append of the new one run under the key's lock, so two concurrent
//! attempts inside one cooldown window cannot both succeed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use colegio_core::error::{ColegioError, ColegioResult};
use colegio_core::models::meal_benefit::MealKey;
use colegio_core::models::meal_config::MealRegistrationConfig;
use colegio_core::models::meal_registration::{CreateMealRegistration, MealRegistration};
use colegio_core::repository::{
    MealBenefitRepository, MealConfigRepository, MealRegistrationRepository, StudentRepository,
};
use colegio_core::{Actor, TenantContext};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ComedorConfig;
use crate::locks::KeyedLocks;

/// Note attached to registrations made from a scanned identification.
pub const SCANNER_NOTE: &str = "QR reader";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EligibilityState {
    Eligible,
    JustRegistered {
        last_served_at: DateTime<Utc>,
        remaining_minutes: i64,
    },
}

/// Where a key stands `interval_minutes` after its last registration.
///
/// The interval is satisfied once exactly `interval_minutes` have passed.
/// Remaining time is rounded up to whole minutes.
pub fn evaluate(
    last_served_at: Option<DateTime<Utc>>,
    interval_minutes: u32,
    now: DateTime<Utc>,
) -> EligibilityState {
    let Some(last_served_at) = last_served_at else {
        return EligibilityState::Eligible;
    };
    let interval_secs = i64::from(interval_minutes) * 60;
    let elapsed_secs = (now - last_served_at).num_seconds();
    if elapsed_secs >= interval_secs {
        return EligibilityState::Eligible;
    }
    let remaining_secs = interval_secs - elapsed_secs;
    EligibilityState::JustRegistered {
        last_served_at,
        remaining_minutes: (remaining_secs + 59) / 60,
    }
}

/// Registers meals and administers the per-institution interval.
pub struct MealRegistrationEngine<B, C, R, S>
where
    B: MealBenefitRepository,
    C: MealConfigRepository,
    R: MealRegistrationRepository,
    S: StudentRepository,
{
    benefits: B,
    configs: C,
    registrations: R,
    students: S,
    locks: Arc<KeyedLocks>,
    config: ComedorConfig,
}

impl<B, C, R, S> MealRegistrationEngine<B, C, R, S>
where
    B: MealBenefitRepository,
    C: MealConfigRepository,
    R: MealRegistrationRepository,
    S: StudentRepository,
{
    pub fn new(
        benefits: B,
        configs: C,
        registrations: R,
        students: S,
        config: ComedorConfig,
    ) -> Self {
        Self::with_locks(
            benefits,
            configs,
            registrations,
            students,
            config,
            Arc::new(KeyedLocks::new()),
        )
    }

    /// Share a lock table with the benefit registry.
    pub fn with_locks(
        benefits: B,
        configs: C,
        registrations: R,
        students: S,
        config: ComedorConfig,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            benefits,
            configs,
            registrations,
            students,
            locks,
            config,
        }
    }

    /// Record a meal served to a student.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_meal(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        student_id: Uuid,
        actor: &Actor,
        now: DateTime<Utc>,
        note: Option<String>,
    ) -> ColegioResult<MealRegistration> {
        ctx.authorize(institution_id)?;
        let key = MealKey::new(institution_id, term_id, student_id);
        let _guard = self.locks.lock(key).await;

        if !self.benefits.is_active(key).await? {
            debug!(student_id = %student_id, "Meal refused: no active benefit");
            return Err(ColegioError::NoBenefit { student_id });
        }

        let interval = self.effective_interval(institution_id).await?;
        let last = self.registrations.last_for(key).await?;

        if let EligibilityState::JustRegistered {
            last_served_at,
            remaining_minutes,
        } = evaluate(last.map(|r| r.served_at), interval, now)
        {
            debug!(
                student_id = %student_id,
                remaining_minutes,
                "Meal refused: interval not elapsed"
            );
            return Err(ColegioError::TooSoon {
                remaining_minutes,
                last_served_at,
            });
        }

        let registration = self
            .registrations
            .append(CreateMealRegistration {
                institution_id: Some(institution_id),
                term_id,
                student_id,
                served_on: self.config.local_day(now),
                served_at: now,
                note,
                recorded_by: Some(actor.user_id),
            })
            .await?;

        info!(
            institution_id = %institution_id,
            term_id = %term_id,
            student_id = %student_id,
            served_on = %registration.served_on,
            "Meal registered"
        );
        Ok(registration)
    }

    /// Resolve a scanned identification within the institution and
    /// register a meal for that student.
    pub async fn register_by_identification(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        identification: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ColegioResult<MealRegistration> {
        ctx.authorize(institution_id)?;
        let student = self
            .students
            .get_by_identification(institution_id, identification)
            .await?;
        self.register_meal(
            ctx,
            institution_id,
            term_id,
            student.id,
            actor,
            now,
            Some(SCANNER_NOTE.to_string()),
        )
        .await
    }

    /// Current state of a key.
    pub async fn eligibility(
        &self,
        ctx: &TenantContext,
        key: MealKey,
        now: DateTime<Utc>,
    ) -> ColegioResult<EligibilityState> {
        ctx.authorize(key.institution_id)?;
        let interval = self.effective_interval(key.institution_id).await?;
        let last = self.registrations.last_for(key).await?;
        Ok(evaluate(last.map(|r| r.served_at), interval, now))
    }

    /// The institution's interval, creating its configuration row with
    /// the default on first reference.
    pub async fn interval_minutes(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
    ) -> ColegioResult<u32> {
        ctx.authorize(institution_id)?;
        let config = self
            .configs
            .get_or_create(institution_id, self.config.default_interval_minutes)
            .await?;
        Ok(config.minimum_interval_minutes)
    }

    pub async fn set_interval(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        minutes: u32,
        actor: &Actor,
    ) -> ColegioResult<MealRegistrationConfig> {
        ctx.authorize(institution_id)?;
        if minutes == 0 {
            return Err(ColegioError::Validation {
                message: "minimum interval must be at least one minute".into(),
            });
        }
        self.configs
            .set_interval(institution_id, minutes, Some(actor.user_id))
            .await
    }

    async fn effective_interval(&self, institution_id: Uuid) -> ColegioResult<u32> {
        Ok(self
            .configs
            .get(institution_id)
            .await?
            .map(|c| c.minimum_interval_minutes)
            .unwrap_or(self.config.default_interval_minutes))
    }
}
