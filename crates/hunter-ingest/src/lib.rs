//! Reads date-partitioned security-event archives from local disk or over SFTP.
//!
//! Ingestion never fails outright: bad lines and missing days are skipped, and a
//! connection-level failure yields an empty report with the reason recorded.

pub mod archive;
pub mod local;
pub mod remote;
pub mod stats;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{error, info};

use hunter_core::{DayRange, IngestError, LogRecord, ServiceConfig};

pub use archive::{ArchiveLayout, ArchiveReader};
pub use local::LocalArchive;
pub use remote::{HostKeyPolicy, RemoteSource, SftpArchive};
pub use stats::LogStats;

/// Where archives are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSource {
    Local { root: PathBuf },
    Remote { root: PathBuf, ssh: RemoteSource },
}

impl LogSource {
    pub fn from_config(config: &ServiceConfig) -> Self {
        let root = config.archive_root.clone();
        match &config.remote {
            Some(remote) => Self::Remote {
                root,
                ssh: RemoteSource::from(remote),
            },
            None => Self::Local { root },
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Self::Local { root } | Self::Remote { root, .. } => root,
        }
    }

    /// Short description for logs and diagnostics.
    pub fn label(&self) -> String {
        match self {
            Self::Local { root } => format!("local:{}", root.display()),
            Self::Remote { root, ssh } => {
                format!("{}@{}:{}", ssh.user, ssh.host, root.display())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogQuery {
    pub days: DayRange,
    pub source: LogSource,
    pub prefix: String,
    /// Most recent day to read; the walk goes backwards from here.
    pub end: NaiveDate,
}

impl LogQuery {
    /// Query ending today (local time) using the configured source and prefix.
    pub fn from_config(config: &ServiceConfig, days: DayRange) -> Self {
        Self {
            days,
            source: LogSource::from_config(config),
            prefix: config.archive_prefix.clone(),
            end: chrono::Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<LogRecord>,
    pub days_scanned: u32,
    pub days_loaded: u32,
    pub lines_skipped: u64,
    /// Set when the source could not be reached at all.
    pub failure: Option<IngestError>,
}

impl IngestReport {
    fn failed(days: DayRange, failure: IngestError) -> Self {
        Self {
            days_scanned: u32::from(days.get()),
            failure: Some(failure),
            ..Default::default()
        }
    }
}

/// Run an ingestion on the current thread. Performs blocking I/O.
pub fn ingest_blocking(query: &LogQuery) -> IngestReport {
    let started = Instant::now();
    let layout = ArchiveLayout::new(query.source.root(), query.prefix.clone());

    let walked = match &query.source {
        LogSource::Local { .. } => Ok(archive::walk_days(
            &mut LocalArchive,
            &layout,
            query.days,
            query.end,
        )),
        LogSource::Remote { ssh, .. } => SftpArchive::connect(ssh)
            .map(|mut sftp| archive::walk_days(&mut sftp, &layout, query.days, query.end)),
    };

    match walked {
        Ok(walk) => {
            info!(
                source = %query.source.label(),
                days = query.days.get(),
                days_loaded = walk.days_loaded,
                records = walk.records.len(),
                skipped_lines = walk.skipped_lines,
                duration_ms = started.elapsed().as_millis() as u64,
                "ingestion complete"
            );
            IngestReport {
                records: walk.records,
                days_scanned: u32::from(query.days.get()),
                days_loaded: walk.days_loaded,
                lines_skipped: walk.skipped_lines,
                failure: None,
            }
        }
        Err(e) => {
            error!(
                source = %query.source.label(),
                error_kind = e.error_kind(),
                error = %e,
                "ingestion source unreachable, returning no records"
            );
            IngestReport::failed(query.days, e)
        }
    }
}

/// Run an ingestion on the blocking pool.
pub async fn ingest(query: LogQuery) -> IngestReport {
    let days = query.days;
    match tokio::task::spawn_blocking(move || ingest_blocking(&query)).await {
        Ok(report) => report,
        Err(e) => IngestReport::failed(days, IngestError::Task(e.to_string())),
    }
}
