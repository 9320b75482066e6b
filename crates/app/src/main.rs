mod cli;
mod db;
mod interactive;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prep_core::Clock;
use prep_core::model::{BatchId, BatchStatus, CourseId, UserId};
use services::{AppServices, ServicesConfig};

use crate::cli::{Cli, Commands};
use crate::db::{normalize_sqlite_url, prepare_sqlite_file};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with the session on stdout.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = ServicesConfig::load(cli.config.as_deref()).context("loading config")?;

    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, config, Clock::system())
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(db = %db_url, "storage ready");

    if let Commands::Seed = cli.command {
        let summary = services.seed().await?;
        println!(
            "Seeded {} courses, {} exam batches, {} users.",
            summary.courses, summary.batches, summary.users
        );
        return Ok(());
    }

    let ctx = services
        .session_context(&UserId::new(cli.user_id))
        .await
        .context("run `seed` first, or pass --user with a known id")?;

    match cli.command {
        Commands::Seed => {}
        Commands::Import { file, target } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = services.imports().import(&ctx, &raw, target.into()).await?;
            println!(
                "Imported {} '{}' ({}) with {} questions.",
                summary.target, summary.name, summary.id, summary.question_count
            );
        }
        Commands::Courses => {
            for course in services.practice().list_courses().await? {
                let resume = services
                    .practice()
                    .progress_for(ctx.user_id(), course.id())
                    .await?
                    .map_or(0, |p| p.last_index);
                println!(
                    "{:<24} {:<36} {:<12} {} questions, next #{}",
                    course.id(),
                    course.name(),
                    course.category(),
                    course.question_count(),
                    resume + 1,
                );
            }
        }
        Commands::Batches => {
            for listing in services.exams().list_batches(&ctx).await? {
                let status = match listing.status {
                    BatchStatus::Locked => "locked",
                    BatchStatus::Available => "available",
                    BatchStatus::Passed => "passed",
                };
                println!(
                    "{:<24} {:<36} {:>3} questions {:>4} min  {status}",
                    listing.batch.id(),
                    listing.batch.name(),
                    listing.batch.total_questions(),
                    listing.batch.time_limit_minutes(),
                );
            }
        }
        Commands::Exam { batch } => {
            let session = services
                .exams()
                .start_exam(&ctx, &BatchId::new(batch))
                .await?;
            interactive::run_exam(&services.exam_driver(), session).await?;
        }
        Commands::Practice { course } => {
            let session = services
                .practice()
                .start_practice(&ctx, &CourseId::new(course))
                .await?;
            interactive::run_practice(&services.practice_driver(), session).await?;
        }
    }

    Ok(())
}
