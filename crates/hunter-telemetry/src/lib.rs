use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Where formatted log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable lines on stdout.
    Pretty,
    /// One JSON object per line on stdout.
    Json,
    /// Append plain lines to a file (daemon mode).
    File(PathBuf),
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "hunter_ingest" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    pub output: LogOutput,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            output: LogOutput::Pretty,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Returned by `init_telemetry`; describes what was installed.
#[derive(Debug)]
pub struct TelemetryGuard {
    output: LogOutput,
    directive: String,
}

impl TelemetryGuard {
    pub fn output(&self) -> &LogOutput {
        &self.output
    }

    /// The filter directive used when RUST_LOG is not set.
    pub fn directive(&self) -> &str {
        &self.directive
    }
}

/// Build the default filter directive from config, e.g. `info,hunter_ingest=debug`.
pub fn filter_directive(config: &TelemetryConfig) -> String {
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter_str
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let directive = filter_directive(&config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let layer = match &config.output {
        LogOutput::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        LogOutput::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed(),
        LogOutput::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(env_filter)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    Ok(TelemetryGuard {
        output: config.output,
        directive,
    })
}
