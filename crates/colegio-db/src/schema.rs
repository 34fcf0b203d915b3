//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings, calendar days as `YYYY-MM-DD` strings, enums as strings with
//! ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Institutions (global scope, tenant root)
-- =======================================================================
DEFINE TABLE institution SCHEMAFULL;
DEFINE FIELD name ON TABLE institution TYPE string;
DEFINE FIELD email ON TABLE institution TYPE string;
DEFINE FIELD phone ON TABLE institution TYPE string DEFAULT '';
DEFINE FIELD address ON TABLE institution TYPE string DEFAULT '';
DEFINE FIELD kind ON TABLE institution TYPE string \
    ASSERT $value IN ['Academic', 'Technical'];
DEFINE FIELD license_start ON TABLE institution TYPE string;
DEFINE FIELD license_end ON TABLE institution TYPE string;
DEFINE FIELD created_at ON TABLE institution TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_institution_name ON TABLE institution \
    COLUMNS name UNIQUE;
DEFINE INDEX idx_institution_email ON TABLE institution \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Memberships (user x institution x role)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD institution_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['Admin', 'Teacher', 'Staff'];
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_institution ON TABLE membership \
    COLUMNS user_id, institution_id UNIQUE;

-- =======================================================================
-- Academic terms (global scope)
-- =======================================================================
DEFINE TABLE academic_term SCHEMAFULL;
DEFINE FIELD year ON TABLE academic_term TYPE int;
DEFINE FIELD name ON TABLE academic_term TYPE string;
DEFINE FIELD active ON TABLE academic_term TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE academic_term TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_academic_term_year ON TABLE academic_term \
    COLUMNS year UNIQUE;

-- =======================================================================
-- Students (institution scope)
-- =======================================================================
DEFINE TABLE student SCHEMAFULL;
DEFINE FIELD institution_id ON TABLE student TYPE string;
DEFINE FIELD identification ON TABLE student TYPE string;
DEFINE FIELD given_names ON TABLE student TYPE string;
DEFINE FIELD first_surname ON TABLE student TYPE string;
DEFINE FIELD second_surname ON TABLE student TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE student TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE student TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_student_institution_identification ON TABLE student \
    COLUMNS institution_id, identification UNIQUE;

-- =======================================================================
-- Meal benefits (institution scope, one record per key)
-- =======================================================================
DEFINE TABLE meal_benefit SCHEMAFULL;
DEFINE FIELD institution_id ON TABLE meal_benefit TYPE string;
DEFINE FIELD term_id ON TABLE meal_benefit TYPE string;
DEFINE FIELD student_id ON TABLE meal_benefit TYPE string;
DEFINE FIELD active ON TABLE meal_benefit TYPE bool DEFAULT true;
DEFINE FIELD granted_at ON TABLE meal_benefit TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD granted_by ON TABLE meal_benefit TYPE option<string>;
DEFINE FIELD updated_at ON TABLE meal_benefit TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_by ON TABLE meal_benefit TYPE option<string>;
DEFINE INDEX idx_meal_benefit_key ON TABLE meal_benefit \
    COLUMNS institution_id, term_id, student_id UNIQUE;
DEFINE INDEX idx_meal_benefit_active ON TABLE meal_benefit \
    COLUMNS institution_id, term_id, active;

-- =======================================================================
-- Meal registration config (one per institution, record id = institution)
-- =======================================================================
DEFINE TABLE meal_config SCHEMAFULL;
DEFINE FIELD institution_id ON TABLE meal_config TYPE string;
DEFINE FIELD minimum_interval_minutes ON TABLE meal_config TYPE int \
    ASSERT $value > 0;
DEFINE FIELD updated_at ON TABLE meal_config TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_by ON TABLE meal_config TYPE option<string>;
DEFINE INDEX idx_meal_config_institution ON TABLE meal_config \
    COLUMNS institution_id UNIQUE;

-- =======================================================================
-- Meal registrations (institution scope, append-only log)
-- =======================================================================
DEFINE TABLE meal_registration SCHEMAFULL;
DEFINE FIELD institution_id ON TABLE meal_registration TYPE string;
DEFINE FIELD term_id ON TABLE meal_registration TYPE string;
DEFINE FIELD student_id ON TABLE meal_registration TYPE string;
DEFINE FIELD served_on ON TABLE meal_registration TYPE string;
DEFINE FIELD served_at ON TABLE meal_registration TYPE datetime;
DEFINE FIELD note ON TABLE meal_registration TYPE option<string>;
DEFINE FIELD recorded_by ON TABLE meal_registration TYPE option<string>;
DEFINE INDEX idx_meal_registration_day ON TABLE meal_registration \
    COLUMNS institution_id, term_id, served_on;
DEFINE INDEX idx_meal_registration_student ON TABLE meal_registration \
    COLUMNS institution_id, term_id, student_id, served_at;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD session_key ON TABLE session TYPE string;
DEFINE FIELD institution_id ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_key ON TABLE session \
    COLUMNS session_key UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session \
    COLUMNS user_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Highest applied migration version, 0 on a fresh database.
async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let records: Vec<MigrationRecord> = db
        .query("SELECT version, name FROM _migration ORDER BY version DESC LIMIT 1")
        .await?
        .take(0)?;
    Ok(records.into_iter().next().map_or(0, |m| m.version))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let fail = |stage: &str, e: surrealdb::Error| {
        DbError::Migration(format!(
            "v{} {} ({stage}): {e}",
            migration.version, migration.name
        ))
    };

    db.query(migration.sql)
        .await?
        .check()
        .map_err(|e| fail("ddl", e))?;
    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| fail("record", e))?;
    Ok(())
}

/// Bring the schema up to date. Safe to call on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = applied_version(db).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > current);
    let mut applied = 0usize;
    for migration in pending {
        apply(db, migration).await?;
        info!(version = migration.version, name = migration.name, "Migration applied");
        applied += 1;
    }
    if applied == 0 {
        debug!(version = current, "Schema up to date");
    }
    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "institution",
            "membership",
            "academic_term",
            "student",
            "meal_benefit",
            "meal_config",
            "meal_registration",
            "session",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn registrations_have_no_uniqueness_constraint() {
        let indexes: Vec<&str> = SCHEMA_V1
            .lines()
            .filter(|l| l.starts_with("DEFINE INDEX") && l.contains("ON TABLE meal_registration"))
            .collect();
        assert_eq!(indexes.len(), 2);
        assert!(indexes.iter().all(|l| !l.contains("UNIQUE")));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
