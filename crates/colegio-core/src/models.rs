//! Domain models for Colegio.
//!
//! These are the core types shared across all crates.

pub mod academic_term;
pub mod institution;
pub mod meal_benefit;
pub mod meal_config;
pub mod meal_registration;
pub mod membership;
pub mod session;
pub mod student;
