//! Command-line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use colegio_comedor::{ComedorConfig, ReportPeriod};
use colegio_db::DbConfig;
use colegio_geo::GeoSources;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "colegio")]
#[command(version)]
#[command(about = "Colegio maintenance and administration", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub db: DbArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct DbArgs {
    /// SurrealDB WebSocket address
    #[arg(long, env = "COLEGIO_DB_URL", default_value = "127.0.0.1:8000")]
    pub db_url: String,

    #[arg(long, env = "COLEGIO_DB_NS", default_value = "colegio")]
    pub db_namespace: String,

    #[arg(long, env = "COLEGIO_DB_NAME", default_value = "main")]
    pub db_name: String,

    #[arg(long, env = "COLEGIO_DB_USER", default_value = "root")]
    pub db_user: String,

    #[arg(long, env = "COLEGIO_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    pub db_password: String,
}

impl DbArgs {
    pub fn config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_name.clone(),
            username: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Remove the active institution from every session of a user
    ClearInstitution {
        #[arg(long)]
        user: Uuid,
    },
    /// Delete sessions of one user, or all sessions
    #[command(group(ArgGroup::new("target").required(true).args(["user", "all"])))]
    ClearSessions {
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long)]
        all: bool,
    },
    /// Delete expired sessions
    CleanupSessions,
    /// Download and consolidate province/canton/district data
    ImportGeo(ImportGeoArgs),
    /// Show or change an institution's minimum meal interval
    MealInterval(MealIntervalArgs),
    /// Print a cafeteria usage report as JSON
    MealReport(MealReportArgs),
}

#[derive(Args)]
pub struct ImportGeoArgs {
    /// Output CSV path
    #[arg(long, default_value = "data/ubicaciones.csv")]
    pub out: PathBuf,

    #[arg(long, env = "COLEGIO_GEO_PROVINCES_URL")]
    pub provinces_url: Option<String>,

    #[arg(long, env = "COLEGIO_GEO_CANTONS_URL")]
    pub cantons_url: Option<String>,

    #[arg(long, env = "COLEGIO_GEO_DISTRICTS_URL")]
    pub districts_url: Option<String>,
}

impl ImportGeoArgs {
    pub fn sources(&self) -> GeoSources {
        let defaults = GeoSources::default();
        GeoSources {
            provinces: self.provinces_url.clone().unwrap_or(defaults.provinces),
            cantons: self.cantons_url.clone().unwrap_or(defaults.cantons),
            districts: self.districts_url.clone().unwrap_or(defaults.districts),
        }
    }
}

#[derive(Args)]
pub struct MealIntervalArgs {
    #[arg(long)]
    pub institution: Uuid,

    /// New interval in minutes; omit to print the current value
    #[arg(long)]
    pub minutes: Option<u32>,

    /// User recorded as the updater
    #[arg(long, env = "COLEGIO_OPERATOR_ID")]
    pub operator: Option<Uuid>,

    /// Interval used when the institution has no configuration yet
    #[arg(long, env = "COLEGIO_DEFAULT_MEAL_INTERVAL", default_value_t = 1200)]
    pub default_minutes: u32,

    /// Local offset from UTC in minutes
    #[arg(long, env = "COLEGIO_UTC_OFFSET_MINUTES", default_value_t = -360, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,
}

impl MealIntervalArgs {
    pub fn comedor_config(&self) -> ComedorConfig {
        ComedorConfig {
            default_interval_minutes: self.default_minutes,
            utc_offset_minutes: self.utc_offset_minutes,
            ..ComedorConfig::default()
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
    Range,
}

#[derive(Args)]
pub struct MealReportArgs {
    #[arg(long)]
    pub institution: Uuid,

    /// Academic term; defaults to the active term
    #[arg(long)]
    pub term: Option<Uuid>,

    #[arg(long, value_enum, default_value = "month")]
    pub period: PeriodArg,

    /// First day for `--period range` (YYYY-MM-DD)
    #[arg(long, required_if_eq("period", "range"))]
    pub from: Option<NaiveDate>,

    /// Last day for `--period range` (YYYY-MM-DD)
    #[arg(long, required_if_eq("period", "range"))]
    pub to: Option<NaiveDate>,

    #[arg(long, env = "COLEGIO_UTC_OFFSET_MINUTES", default_value_t = -360, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,
}

impl MealReportArgs {
    pub fn report_period(&self) -> ReportPeriod {
        match (self.period, self.from, self.to) {
            (PeriodArg::Day, ..) => ReportPeriod::Day,
            (PeriodArg::Week, ..) => ReportPeriod::Week,
            (PeriodArg::Range, Some(from), Some(to)) => ReportPeriod::Range(from, to),
            // clap enforces both bounds for ranges.
            (PeriodArg::Month | PeriodArg::Range, ..) => ReportPeriod::Month,
        }
    }

    pub fn comedor_config(&self) -> ComedorConfig {
        ComedorConfig {
            utc_offset_minutes: self.utc_offset_minutes,
            ..ComedorConfig::default()
        }
    }
}
