//! f1stats - Formula 1 constructors' championship statistics over HTTP.
//!
//! Serves the cached league table, or with `--repopulate` /
//! `--refresh-race-stats` runs a single refresh against the cache and exits.

mod config;
mod health;
mod web;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use f1stats_core::{
    CacheManager, ErgastClient, FlagTable, KvStore, MemoryStore, RedisStore, RefreshController,
    RefreshSummary,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;

/// Base name of the daily log files
const LOG_FILE_PREFIX: &str = "f1stats.log";

/// Initialize the tracing subscriber for logging
///
/// The returned guard flushes the file writer and has to live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn build_store(config: &Config) -> Result<Arc<dyn KvStore>> {
    if config.uses_memory_store() {
        warn!("Using the in-process store, cached records are lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = RedisStore::connect(&config.redis_url)
        .with_context(|| format!("Invalid Redis URL {}", config.redis_url))?;
    Ok(Arc::new(store))
}

fn build_controller(config: &Config) -> Result<RefreshController> {
    let flags = match &config.flags_path {
        Some(path) => FlagTable::with_overrides(path)
            .with_context(|| format!("Could not load flag table {}", path.display()))?,
        None => FlagTable::embedded(),
    };
    info!(entries = flags.len(), "Flag table loaded");

    let client = ErgastClient::new(&config.upstream)?;
    let cache = CacheManager::new(build_store(config)?, config.refresh.namespace.clone());

    Ok(RefreshController::new(
        Arc::new(client),
        Arc::new(flags),
        cache,
        config.refresh.clone(),
    ))
}

fn print_summary(summary: &RefreshSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(environment = %config.environment, "f1stats starting");

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);
    if let Some(other) = command {
        if other != "--repopulate" && other != "--refresh-race-stats" {
            anyhow::bail!("Unknown argument {}, expected --repopulate or --refresh-race-stats", other);
        }
    }

    let controller = Arc::new(build_controller(&config)?);
    health::wait_for_cache(
        controller.cache(),
        health::STARTUP_PROBE_ATTEMPTS,
        health::STARTUP_PROBE_INTERVAL,
    )
    .await?;

    match command {
        Some("--repopulate") => return print_summary(&controller.repopulate().await?),
        Some("--refresh-race-stats") => {
            return print_summary(&controller.refresh_race_stats().await?)
        }
        _ => {}
    }

    if controller.cache().current_generation().await?.is_none() {
        info!("Cache is empty, starting background repopulation");
        let background = Arc::clone(&controller);
        tokio::spawn(async move {
            match background.repopulate().await {
                Ok(summary) => info!(
                    stored = summary.stored,
                    failed = summary.failed,
                    "Background repopulation finished"
                ),
                Err(e) => error!(error = %e, "Background repopulation failed"),
            }
        });
    }

    serve(&config, controller).await?;

    info!("f1stats shutting down");
    Ok(())
}

async fn serve(config: &Config, controller: Arc<RefreshController>) -> Result<()> {
    let address = (config.listener.host.as_str(), config.listener.port);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Could not listen on {}:{}", address.0, address.1))?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, web::router(controller))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
