//! Polling daemon that watches bus ticket sites and pushes a note when new coaches appear.

mod dry_run;
mod logging;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use ticketwatch_core::{
    CacheStore, JsonFileCache, Monitor, Notifier, PushPort, SourceRegistry,
    http::{HttpSettings, build_client},
};
use ticketwatch_provider_bdtickets as bdtickets;
use ticketwatch_provider_busbd as busbd;
use ticketwatch_push_pushbullet::PushbulletPort;

use crate::dry_run::LogPush;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "ticketwatch", version, about)]
struct Cli {
    /// Run a single check cycle and exit
    #[arg(long)]
    once: bool,

    /// Log notifications instead of pushing them
    #[arg(long)]
    dry_run: bool,

    /// Read variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // variables from the env file may carry RUST_LOG, so load them first
    let env_file_problem = match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            None
        }
        None => dotenvy::dotenv().err().filter(|err| !err.not_found()),
    };

    logging::init(cli.verbose, cli.json_logs);
    if let Some(err) = env_file_problem {
        warn!(error = %err, "ignoring unreadable .env file");
    }

    let settings = Settings::from_env().context("invalid configuration")?;
    settings.log_banner(cli.dry_run);

    let client = build_client(&HttpSettings {
        timeout: settings.http_timeout,
        ..HttpSettings::default()
    })
    .context("failed to build HTTP client")?;

    let registry = Arc::new(enabled_sources(&settings, &client)?);
    let push = push_port(&settings, &client, cli.dry_run)?;
    let cache: Arc<dyn CacheStore> = Arc::new(JsonFileCache::new(settings.cache_dir.clone()));

    let monitor = Monitor::new(
        registry,
        cache,
        Arc::new(Notifier::new(push)),
        settings.monitor_config(),
    );

    if cli.once {
        let report = monitor.run_cycle().await;
        info!(
            fresh = report.fresh_tickets(),
            failed_sources = report.failed_sources(),
            "single cycle finished"
        );
        return Ok(());
    }

    // spawned so the signal handlers are installed before the first cycle starts
    let stop = tokio::spawn(shutdown_signal());
    monitor
        .run(async move {
            if let Err(err) = stop.await {
                warn!(error = %err, "signal listener ended unexpectedly");
            }
        })
        .await;

    info!("ticketwatch stopped");
    Ok(())
}

/// Keep the registered sources named in `ENABLED_SOURCES`, in that order.
fn enabled_sources(settings: &Settings, client: &Client) -> Result<SourceRegistry> {
    let available = SourceRegistry::new(vec![
        bdtickets::plugin(client.clone()),
        busbd::plugin(client.clone()),
    ]);

    let plugins = settings
        .enabled_sources
        .iter()
        .map(|id| {
            available.plugin(id).cloned().with_context(|| {
                let known = available
                    .sources()
                    .iter()
                    .map(|meta| meta.id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown source `{id}` in ENABLED_SOURCES (known: {known})")
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceRegistry::new(plugins))
}

fn push_port(settings: &Settings, client: &Client, dry_run: bool) -> Result<Arc<dyn PushPort>> {
    if dry_run {
        return Ok(Arc::new(LogPush));
    }

    let token = settings
        .pushbullet_api_key
        .clone()
        .context("PUSHBULLET_API_KEY is required unless --dry-run is given")?;
    Ok(Arc::new(PushbulletPort::new(client.clone(), token)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("stop signal received, exiting after the current cycle");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ticketwatch_core::SourceId;

    use super::*;

    fn settings_with_sources(sources: &[&str]) -> Settings {
        Settings {
            travel_date: None,
            return_date: None,
            search_onward: false,
            search_return: false,
            interval: Duration::from_secs(180),
            target_companies: Vec::new(),
            pushbullet_api_key: None,
            cache_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(20),
            enabled_sources: sources.iter().map(|id| SourceId((*id).to_owned())).collect(),
        }
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::parse_from(["ticketwatch", "--once", "--dry-run", "--env-file", "trip.env", "-v"]);
        assert!(cli.once);
        assert!(cli.dry_run);
        assert!(cli.verbose);
        assert!(!cli.json_logs);
        assert_eq!(cli.env_file, Some(PathBuf::from("trip.env")));
    }

    #[test]
    fn test_enabled_sources_keep_requested_order() {
        let registry = enabled_sources(&settings_with_sources(&["busbd", "bdtickets"]), &Client::new())
            .expect("both sources exist");

        let ids: Vec<String> = registry.iter().map(|plugin| plugin.meta.id.to_string()).collect();
        assert_eq!(ids, vec!["busbd", "bdtickets"]);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let err = enabled_sources(&settings_with_sources(&["redbus"]), &Client::new())
            .expect_err("redbus is not a source");
        assert!(err.to_string().contains("redbus"));
    }

    #[test]
    fn test_push_requires_token_unless_dry_run() {
        let settings = settings_with_sources(&["busbd"]);
        assert!(push_port(&settings, &Client::new(), false).is_err());
        assert!(push_port(&settings, &Client::new(), true).is_ok());
    }
}
