// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook Daemon (hkd)
//!
//! Background process that drives repository events, scheduler firings and
//! workflow run cascades against the platform API.
//!
//! Architecture:
//! - Dispatch Tasks: `HK_WORKERS` loops popping the repository event queue
//! - Cascade Task: pops completed workflow runs and fans them out
//! - Scheduler Task: fires due cron schedules
//! - Recovery Task: re-enqueues stale in-progress records
//! - Maintenance Task: follows the maintenance flag channel

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use hk_daemon::lifecycle::{self, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Interval between queue statistics log lines
const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config loading
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("hkd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("hkd {}", env!("CARGO_PKG_VERSION"));
                println!("Hook Daemon - processes repository events, schedules and run cascades");
                println!();
                println!("USAGE:");
                println!("    hkd");
                println!();
                println!("Configuration is read from HK_* environment variables;");
                println!("HK_API_URL is required.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: hkd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let log_guard = setup_logging(&config)?;

    info!(state_dir = %config.state_dir.display(), "starting hook daemon");

    let runtime = match lifecycle::startup(&config) {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    let mut tasks = lifecycle::spawn_tasks(&runtime, config.workers, &cancel);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // NOTE: created outside the loop; select! re-evaluates its branches on
    // every iteration
    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);

    info!("Daemon ready");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }

            // Any task ending on its own means the store failed; stop so
            // supervision restarts the process
            Some(exit) = tasks.join_next() => {
                lifecycle::report_exit(exit);
                warn!("background task ended, shutting down...");
                break;
            }

            _ = stats_tick.tick() => {
                match runtime.stats().await {
                    Ok(stats) => info!(
                        events_queued = stats.events_queued,
                        events_in_progress = stats.events_in_progress,
                        events_enqueued = stats.events.enqueued,
                        events_dequeued = stats.events.dequeued,
                        outgoing_queued = stats.outgoing_queued,
                        outgoing_in_progress = stats.outgoing_in_progress,
                        maintenance = runtime.is_maintenance(),
                        "queue stats"
                    ),
                    Err(e) => warn!(error = %e, "failed to read queue stats"),
                }
            }
        }
    }

    lifecycle::shutdown(&cancel, tasks).await;
    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
