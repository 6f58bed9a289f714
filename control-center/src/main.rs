mod config;

use clap::{Parser, Subcommand};
use config::{Config, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "control-center", about = "Portfolio control center API")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the dashboard API
    Portal {
        #[arg(long)]
        config_file_path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Portal { config_file_path } => {
            let config = match Config::from_file(&config_file_path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{}: {e}", config_file_path.display());
                    return ExitCode::FAILURE;
                }
            };

            let _sentry = init_logging(config.common.logging.as_ref());
            if let Some(metrics) = &config.common.metrics {
                if let Err(e) = init_statsd(metrics) {
                    tracing::error!(error = %e, "Failed to set up statsd recorder");
                    return ExitCode::FAILURE;
                }
            }

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start runtime");
                    return ExitCode::FAILURE;
                }
            };

            tracing::info!("Starting portal");
            if let Err(e) = runtime.block_on(portal::run(config.portal)) {
                tracing::error!(error = %e, "Portal exited");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

/// Installs the fmt subscriber, plus the Sentry layer when a DSN is set.
/// The returned guard flushes Sentry on drop.
fn init_logging(logging: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let level = logging.map_or("info", |l| l.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let guard = logging
        .and_then(|l| l.sentry_dsn.as_deref())
        .map(|dsn| sentry::init((dsn, sentry::ClientOptions::default())));
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(sentry_layer)
        .init();

    guard
}

fn init_statsd(config: &MetricsConfig) -> Result<(), String> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("control_center"))
        .map_err(|e| e.to_string())?;
    metrics::set_global_recorder(recorder).map_err(|e| e.to_string())?;
    portal::describe_metrics();

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Reporting metrics to statsd"
    );
    Ok(())
}
