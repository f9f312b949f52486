//! Threat-hunter chat service binary: reads configuration, starts logging and serves
//! the WebSocket endpoint until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hunter_core::ServiceConfig;
use hunter_engine::SharedRuntime;
use hunter_server::ServerConfig;
use hunter_telemetry::{init_telemetry, LogOutput, TelemetryConfig};

/// Threat-hunting assistant over Wazuh archives.
#[derive(Parser, Debug)]
#[command(name = "threat-hunter", about = "Threat-hunting chat service")]
struct Cli {
    /// Write logs to the configured log file instead of stdout.
    #[arg(short, long)]
    daemon: bool,

    /// Emit one JSON object per log line on stdout. Ignored with --daemon.
    #[arg(long)]
    json_logs: bool,

    /// Read archives from this host over SSH (overrides REMOTE_HOST).
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env().context("invalid configuration")?;
    if let Some(host) = cli.host {
        config = config.with_remote_host(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let output = match (cli.daemon, cli.json_logs) {
        (true, _) => LogOutput::File(config.log_file.clone()),
        (false, true) => LogOutput::Json,
        (false, false) => LogOutput::Pretty,
    };
    let telemetry = init_telemetry(TelemetryConfig {
        output,
        ..Default::default()
    })
    .context("failed to initialize logging")?;

    let source = match &config.remote {
        Some(remote) => format!("{}@{}:{}", remote.user, remote.host, config.archive_root.display()),
        None => config.archive_root.display().to_string(),
    };
    tracing::info!(
        output = ?telemetry.output(),
        filter = telemetry.directive(),
        "logging initialized"
    );

    tracing::info!(
        backend = %config.backend_url,
        model = %config.model,
        source = %source,
        default_days = config.default_days.get(),
        "starting threat hunter"
    );

    let server_config = ServerConfig::from_service(&config);
    let runtime = Arc::new(SharedRuntime::with_ollama(config));
    let handle = hunter_server::start(server_config, runtime)
        .await
        .context("failed to start server")?;

    tracing::info!(port = handle.port, "threat hunter ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    handle.shutdown().await;
    Ok(())
}
