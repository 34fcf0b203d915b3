//! Cafeteria reporting: per-day counts and period summaries.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use colegio_core::TenantContext;
use colegio_core::error::ColegioResult;
use colegio_core::models::meal_registration::{DailyMealCount, MealRegistration};
use colegio_core::repository::{MealBenefitRepository, MealRegistrationRepository};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ComedorConfig;

/// Reporting window, resolved against a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    /// The reference day only.
    Day,
    /// Monday of the reference week through the reference day.
    Week,
    /// First of the reference month through the reference day.
    Month,
    /// Explicit inclusive bounds, in either order.
    Range(NaiveDate, NaiveDate),
}

impl ReportPeriod {
    /// Inclusive `(from, to)` bounds.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::Day => (today, today),
            Self::Week => {
                let back = i64::from(today.weekday().num_days_from_monday());
                (today - Duration::days(back), today)
            }
            Self::Month => (today.with_day(1).unwrap_or(today), today),
            Self::Range(a, b) if a > b => (b, a),
            Self::Range(a, b) => (a, b),
        }
    }
}

/// Summary of cafeteria activity over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub active_benefits: u64,
    pub registrations: u64,
    pub distinct_students: u64,
    pub by_day: Vec<DailyMealCount>,
    /// Active beneficiaries with no registration in the period.
    pub unused_benefits: Vec<Uuid>,
}

/// Group registrations by served day, ordered by day.
pub fn daily_counts(registrations: &[MealRegistration]) -> Vec<DailyMealCount> {
    let mut days: BTreeMap<NaiveDate, (u64, HashSet<Uuid>)> = BTreeMap::new();
    for r in registrations {
        let entry = days.entry(r.served_on).or_default();
        entry.0 += 1;
        entry.1.insert(r.student_id);
    }
    days.into_iter()
        .map(|(day, (registrations, students))| DailyMealCount {
            day,
            registrations,
            distinct_students: students.len() as u64,
        })
        .collect()
}

pub struct MealReportService<B: MealBenefitRepository, R: MealRegistrationRepository> {
    benefits: B,
    registrations: R,
    config: ComedorConfig,
}

impl<B: MealBenefitRepository, R: MealRegistrationRepository> MealReportService<B, R> {
    pub fn new(benefits: B, registrations: R, config: ComedorConfig) -> Self {
        Self {
            benefits,
            registrations,
            config,
        }
    }

    pub async fn count_by_day(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ColegioResult<Vec<DailyMealCount>> {
        ctx.authorize(institution_id)?;
        let (from, to) = ReportPeriod::Range(from, to).bounds(from);
        let rows = self
            .registrations
            .list_in_range(institution_id, term_id, from, to)
            .await?;
        Ok(daily_counts(&rows))
    }

    pub async fn summary(
        &self,
        ctx: &TenantContext,
        institution_id: Uuid,
        term_id: Uuid,
        period: ReportPeriod,
        today: NaiveDate,
    ) -> ColegioResult<MealReport> {
        ctx.authorize(institution_id)?;
        let (from, to) = period.bounds(today);

        let rows = self
            .registrations
            .list_in_range(institution_id, term_id, from, to)
            .await?;
        let active = self.benefits.list_active(institution_id, term_id).await?;

        let served: HashSet<Uuid> = rows.iter().map(|r| r.student_id).collect();
        let unused_benefits: Vec<Uuid> = active
            .iter()
            .map(|b| b.student_id)
            .filter(|s| !served.contains(s))
            .take(self.config.unused_benefit_report_limit)
            .collect();

        debug!(
            institution_id = %institution_id,
            from = %from,
            to = %to,
            registrations = rows.len(),
            "Built meal report"
        );

        Ok(MealReport {
            from,
            to,
            active_benefits: active.len() as u64,
            registrations: rows.len() as u64,
            distinct_students: served.len() as u64,
            by_day: daily_counts(&rows),
            unused_benefits,
        })
    }
}
