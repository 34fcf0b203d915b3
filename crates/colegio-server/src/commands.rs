//! Subcommand handlers.

use anyhow::Context;
use chrono::Utc;
use colegio_comedor::{MealRegistrationEngine, MealReportService};
use colegio_core::repository::{AcademicTermRepository, SessionRepository};
use colegio_core::{Actor, TenantContext};
use colegio_db::DbManager;
use colegio_db::repository::{
    SurrealAcademicTermRepository, SurrealMealBenefitRepository, SurrealMealConfigRepository,
    SurrealMealRegistrationRepository, SurrealSessionRepository, SurrealStudentRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::cli::{Cli, Command, ImportGeoArgs, MealIntervalArgs, MealReportArgs};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // The geographic import is offline data preparation and needs no
    // database.
    if let Command::ImportGeo(args) = &cli.command {
        return import_geo(args).await;
    }

    let config = cli.db.config();
    if let Command::Migrate = cli.command {
        DbManager::open(&config)
            .await
            .context("migrating the school database")?;
        println!("Schema is up to date");
        return Ok(());
    }

    let db = DbManager::connect(&config)
        .await
        .context("connecting to SurrealDB")?
        .into_client();

    match cli.command {
        Command::ClearInstitution { user } => {
            let sessions = SurrealSessionRepository::new(db);
            let changed = sessions.clear_institution_for_user(user).await?;
            info!(user_id = %user, changed, "Cleared active institution from sessions");
            println!("Cleared the active institution from {changed} session(s)");
        }
        Command::ClearSessions { user, all } => {
            let sessions = SurrealSessionRepository::new(db);
            let deleted = match (user, all) {
                (Some(user), _) => sessions.delete_for_user(user).await?,
                (None, true) => sessions.delete_all().await?,
                (None, false) => anyhow::bail!("pass --user or --all"),
            };
            info!(deleted, "Sessions deleted");
            println!("Deleted {deleted} session(s)");
        }
        Command::CleanupSessions => {
            let sessions = SurrealSessionRepository::new(db);
            let removed = sessions.cleanup_expired(Utc::now()).await?;
            info!(removed, "Expired sessions removed");
            println!("Removed {removed} expired session(s)");
        }
        Command::MealInterval(args) => meal_interval(db, &args).await?,
        Command::MealReport(args) => meal_report(db, &args).await?,
        Command::Migrate | Command::ImportGeo(_) => {}
    }

    Ok(())
}

async fn import_geo(args: &ImportGeoArgs) -> anyhow::Result<()> {
    let written = colegio_geo::import(&args.sources(), &args.out)
        .await
        .context("importing geographic data")?;
    println!("Wrote {written} location(s) to {}", args.out.display());
    Ok(())
}

async fn meal_interval<C: surrealdb::Connection>(
    db: surrealdb::Surreal<C>,
    args: &MealIntervalArgs,
) -> anyhow::Result<()> {
    let engine = MealRegistrationEngine::new(
        SurrealMealBenefitRepository::new(db.clone()),
        SurrealMealConfigRepository::new(db.clone()),
        SurrealMealRegistrationRepository::new(db.clone()),
        SurrealStudentRepository::new(db),
        args.comedor_config(),
    );

    match args.minutes {
        Some(minutes) => {
            let operator = Actor::superuser(args.operator.unwrap_or(Uuid::nil()));
            let config = engine
                .set_interval(&TenantContext::Global, args.institution, minutes, &operator)
                .await?;
            println!(
                "Institution {} now allows one meal every {} minute(s)",
                config.institution_id, config.minimum_interval_minutes
            );
        }
        None => {
            let minutes = engine
                .interval_minutes(&TenantContext::Global, args.institution)
                .await?;
            println!("Institution {} interval: {minutes} minute(s)", args.institution);
        }
    }
    Ok(())
}

async fn meal_report<C: surrealdb::Connection>(
    db: surrealdb::Surreal<C>,
    args: &MealReportArgs,
) -> anyhow::Result<()> {
    let term_id = match args.term {
        Some(term) => term,
        None => SurrealAcademicTermRepository::new(db.clone())
            .get_active()
            .await?
            .map(|t| t.id)
            .context("no active academic term; pass --term")?,
    };

    let config = args.comedor_config();
    let today = config.local_day(Utc::now());
    let reports = MealReportService::new(
        SurrealMealBenefitRepository::new(db.clone()),
        SurrealMealRegistrationRepository::new(db),
        config,
    );
    let report = reports
        .summary(
            &TenantContext::Global,
            args.institution,
            term_id,
            args.report_period(),
            today,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
