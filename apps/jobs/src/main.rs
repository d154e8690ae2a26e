//! # barokah-jobs
//!
//! Scheduled triggers for the order and promotion engine.
//!
//! ## Run Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every jobs.expiry_interval_secs                                       │
//! │     ├── OrderStateMachine::expire_overdue()                            │
//! │     └── once per store day, at/after jobs.birthday_sweep_hour          │
//! │            └── BirthdaySweep::run()                                    │
//! │                                                                         │
//! │  Ctrl+C / SIGTERM → finish the current tick, close the pool, exit      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both jobs are idempotent, so overlapping cron runs and restarts are
//! harmless.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use barokah_core::loyalty::store_date;
use barokah_db::Database;
use barokah_engine::{Clock, Engine, EngineConfig, OutboxNotificationSink, SharedClock, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "barokah-jobs", about = "Barokah order and promotion jobs", long_about = None)]
struct Cli {
    /// Path to barokah.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "BAROKAH_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cancel PROCESSING orders whose payment deadline has passed
    ExpireOverdue,

    /// Send birthday promotions for today (and persist grants in materialized mode)
    BirthdaySweep {
        /// Print the sweep report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run both jobs on the configured schedule until interrupted
    Run,

    /// Write the effective configuration to the config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.clone()).context("failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    if let Commands::InitConfig { force } = cli.command {
        return init_config(&config, cli.config, force);
    }

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("failed to open database {}", config.database.path.display()))?;

    let clock: SharedClock = Arc::new(SystemClock);
    let sink = Arc::new(OutboxNotificationSink::new(
        db.notifications(),
        clock.clone(),
        config.store_offset(),
    ));
    let engine = Engine::new(db.clone(), clock.clone(), sink, config);

    let result = run_command(&engine, clock.as_ref(), cli.command).await;

    db.close().await;
    result
}

async fn run_command(engine: &Engine, clock: &dyn Clock, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::ExpireOverdue => {
            let expired = engine.orders().expire_overdue().await?;
            println!("{} overdue order(s) cancelled", expired);
        }
        Commands::BirthdaySweep { json } => {
            let report = engine.birthday().run().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} birthday(s): {} loyal, {} conditional, {} grant(s) created",
                    report.birthdays, report.loyal, report.conditional, report.grants_created
                );
            }
        }
        Commands::Run => run_loop(engine, clock).await?,
        Commands::InitConfig { .. } => {}
    }
    Ok(())
}

fn init_config(config: &EngineConfig, path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    if let Some(existing) = path.as_ref().filter(|p| p.exists()) {
        if !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", existing.display());
        }
    }

    config.save(path).context("failed to write configuration")?;
    Ok(())
}

/// Runs expiry every interval and the birthday sweep once per store day.
async fn run_loop(engine: &Engine, clock: &dyn Clock) -> anyhow::Result<()> {
    let jobs = engine.config().jobs.clone();
    let offset = engine.config().store_offset();

    let mut ticker = tokio::time::interval(Duration::from_secs(jobs.expiry_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_sweep: Option<NaiveDate> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(
        expiry_interval_secs = jobs.expiry_interval_secs,
        birthday_sweep_hour = jobs.birthday_sweep_hour,
        "Job loop started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = engine.orders().expire_overdue().await {
                    error!(error = %e, retryable = e.is_retryable(), "Expiry sweep failed");
                }

                let now = clock.now();
                let today = store_date(now, offset);
                let local_hour = now.with_timezone(&offset).hour();

                if local_hour >= jobs.birthday_sweep_hour && last_sweep != Some(today) {
                    match engine.birthday().run().await {
                        Ok(report) => {
                            info!(day = %today, notified = report.notified, "Daily birthday sweep done");
                            last_sweep = Some(today);
                        }
                        Err(e) => error!(error = %e, "Birthday sweep failed, retrying next tick"),
                    }
                }
            }
        }
    }

    info!("Job loop stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping job loop...");
}
