// Operations Gateway - operator REST surface for a workflow engine
//
// This binary loads the gateway configuration, wires the engine and search
// index clients into the gateway and serves the operator routes over HTTP.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

use ops_gateway::config::{LogLevel, LoggingConfig};
use ops_gateway::{build_router, ConfigManager, EngineRestClient, OperationsGateway, SearchIndexClient};

/// Operations Gateway - start, cancel and recover workflow instances
#[derive(Parser)]
#[command(name = "ops-gateway")]
#[command(about = "Operator REST gateway for starting, cancelling and recovering workflow instances")]
#[command(version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut manager = ConfigManager::load(args.config.as_deref()).await?;
    apply_args(&mut manager, &args);

    // Keep the guard alive so buffered file output is flushed on exit
    let _guard = init_logging(&manager.config().logging)?;

    if let Some(source) = manager.source() {
        tracing::info!("Using configuration file {:?}", source);
    }
    for warning in manager.warnings() {
        tracing::warn!("{}", warning);
    }

    let validation = manager.validate();
    for warning in &validation.warnings {
        tracing::warn!("Configuration warning: {}", warning);
    }
    if !validation.is_valid {
        for error in &validation.errors {
            tracing::error!("Configuration error: {}", error);
        }
        bail!("Invalid configuration ({} errors)", validation.errors.len());
    }

    if args.check_config {
        let rendered = serde_yaml::to_string(manager.config())
            .context("Failed to render configuration")?;
        println!("{}", rendered);
        return Ok(());
    }

    let config = manager.config();
    let commands = Arc::new(EngineRestClient::new(config.engine_client_config())?);
    let index = Arc::new(SearchIndexClient::new(config.index_client_config())?);
    let gateway = OperationsGateway::new(commands, index, config.gateway_options());

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    tracing::info!(
        "Operations gateway listening on {} (engine {}, index {})",
        config.server.listen,
        config.engine.base_url,
        config.index.base_url
    );

    axum::serve(listener, build_router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Operations gateway shutdown complete");
    Ok(())
}

/// Command line flags win over file and environment values
fn apply_args(manager: &mut ConfigManager, args: &Args) {
    let config = manager.config_mut();
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if args.verbose {
        config.logging.level = LogLevel::Debug;
    }
    if args.json_logs {
        config.logging.json = true;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging from the logging configuration
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ops_gateway={}", logging.level).into());

    let console = if logging.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file, guard) = match &logging.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {:?}", directory))?;
            let appender = tracing_appender::rolling::daily(directory, "ops-gateway.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            let layer = if logging.json { layer.json().boxed() } else { layer.boxed() };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
