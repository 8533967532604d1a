//! Catalog Migrator Main Entry Point
//!
//! Migrates the kmedia legacy catalog (virtual lessons, containers, file
//! assets) into the MDB catalog and prints the run report.

use std::env;
use std::process::ExitCode;

use catalog_migrator::report::render_summary;
use catalog_migrator::{Args, Dependencies, MigratorError, Settings};
use catalog_migrator_shared::types::{ExitStatus, MigrationReport};
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code when the run cannot start or its report cannot be produced.
const SETUP_FAILURE: u8 = 2;

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), MigratorError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_migrator=info,catalog_migrator_pipeline=info"));

    let json = env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    let initialized = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };
    initialized.map_err(|e| MigratorError::config(format!("Failed to initialize tracing: {e}")))?;

    info!(
        service_name = "catalog-migrator",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        eprintln!("{e}");
        return ExitCode::from(SETUP_FAILURE);
    }

    match run(&args).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            error!(error = %e, "Migration failed");
            ExitCode::from(SETUP_FAILURE)
        }
    }
}

async fn run(args: &Args) -> Result<ExitStatus, MigratorError> {
    let settings = Settings::from_env(args.dry_run)?;
    let config = args.orchestrator_config()?;
    let deps = Dependencies::new(&settings, config, args.dry_run).await?;

    let shutdown = deps.orchestrator.shutdown_handle();
    let signal_listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping after the current lesson");
            let _ = shutdown.send(());
        }
    });

    let result = deps.orchestrator.run(args.scope()).await;
    signal_listener.abort();

    let status = match result {
        Ok(report) => publish(&deps, &report, args.report_json).await.map(|()| report.exit_status()),
        Err(e) => Err(e.into()),
    };

    deps.close().await;
    status
}

async fn publish(deps: &Dependencies, report: &MigrationReport, as_json: bool) -> Result<(), MigratorError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_summary(report));
    }

    match deps.target.counts().await {
        Ok(counts) => info!(
            dry_run = deps.is_dry_run(),
            collections = counts.collections,
            content_units = counts.content_units,
            files = counts.files,
            translations = counts.translations,
            "Target catalog totals"
        ),
        Err(e) => warn!(error = %e, "Failed to count target catalog rows"),
    }
    Ok(())
}
