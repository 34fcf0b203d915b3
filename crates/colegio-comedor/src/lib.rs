//! Colegio Comedor: cafeteria meal benefits, registration eligibility
//! and reporting.
//!
//! Every operation takes an explicit [`TenantContext`](colegio_core::TenantContext)
//! and is generic over the `colegio-core` repository traits, so this
//! crate has no dependency on the database crate.

pub mod benefit;
pub mod config;
pub mod eligibility;
pub mod locks;
pub mod report;

pub use benefit::MealBenefitRegistry;
pub use config::ComedorConfig;
pub use eligibility::{EligibilityState, MealRegistrationEngine};
pub use locks::KeyedLocks;
pub use report::{MealReport, MealReportService, ReportPeriod};
