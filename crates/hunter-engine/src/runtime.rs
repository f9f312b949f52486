//! Process-wide readiness state shared by every session.
//!
//! The active [`RuntimeSnapshot`] is only ever replaced wholesale. Initialization and
//! reloads are serialized by an async lock so two rebuilds never interleave.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use hunter_core::{BridgeError, DayRange, IngestError, ModelBridge, ServiceConfig};
use hunter_ingest::{IngestReport, LogQuery, LogSource};
use hunter_llm::OllamaBridge;

use crate::context::ContextPair;

/// Builds the model bridge for a rebuild.
pub type BridgeFactory =
    Arc<dyn Fn(&ServiceConfig) -> Result<Arc<dyn ModelBridge>, BridgeError> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildMode {
    /// First build: failures degrade instead of aborting.
    Initial,
    /// Operator reload: any failure keeps the previous state.
    Reload,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("log ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("model bridge unavailable: {0}")]
    Bridge(#[from] BridgeError),
}

impl RuntimeError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Ingest(e) => e.error_kind(),
            Self::Bridge(e) => e.error_kind(),
        }
    }
}

/// Accounting from the ingestion behind the current contexts.
#[derive(Clone, Debug, Serialize)]
pub struct IngestSummary {
    pub source: String,
    pub records: usize,
    pub days_scanned: u32,
    pub days_loaded: u32,
    pub lines_skipped: u64,
    pub failure: Option<String>,
}

impl IngestSummary {
    fn from_report(source: &LogSource, report: &IngestReport) -> Self {
        Self {
            source: source.label(),
            records: report.records.len(),
            days_scanned: report.days_scanned,
            days_loaded: report.days_loaded,
            lines_skipped: report.lines_skipped,
            failure: report.failure.as_ref().map(ToString::to_string),
        }
    }
}

pub struct RuntimeSnapshot {
    pub contexts: Option<Arc<ContextPair>>,
    pub bridge: Option<Arc<dyn ModelBridge>>,
    pub default_days: DayRange,
    pub ingest: Option<IngestSummary>,
    pub rebuilt_at: Option<DateTime<Utc>>,
}

impl RuntimeSnapshot {
    fn uninitialized(default_days: DayRange) -> Self {
        Self {
            contexts: None,
            bridge: None,
            default_days,
            ingest: None,
            rebuilt_at: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.rebuilt_at.is_some()
    }

    /// Contexts built and a bridge to answer with.
    pub fn is_ready(&self) -> bool {
        self.contexts.is_some() && self.bridge.is_some()
    }

    pub fn is_degraded(&self) -> bool {
        self.contexts.as_ref().is_some_and(|c| c.degraded)
    }
}

impl std::fmt::Debug for RuntimeSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeSnapshot")
            .field("ready", &self.is_ready())
            .field("degraded", &self.is_degraded())
            .field("default_days", &self.default_days)
            .field("rebuilt_at", &self.rebuilt_at)
            .finish()
    }
}

pub struct SharedRuntime {
    config: ServiceConfig,
    current: RwLock<Arc<RuntimeSnapshot>>,
    rebuild_lock: tokio::sync::Mutex<()>,
    bridge_factory: BridgeFactory,
}

impl SharedRuntime {
    pub fn new(config: ServiceConfig, bridge_factory: BridgeFactory) -> Self {
        let initial = RuntimeSnapshot::uninitialized(config.default_days);
        Self {
            config,
            current: RwLock::new(Arc::new(initial)),
            rebuild_lock: tokio::sync::Mutex::new(()),
            bridge_factory,
        }
    }

    /// Runtime answering through Ollama as configured.
    pub fn with_ollama(config: ServiceConfig) -> Self {
        Self::new(
            config,
            Arc::new(|cfg: &ServiceConfig| {
                OllamaBridge::from_config(cfg).map(|b| Arc::new(b) as Arc<dyn ModelBridge>)
            }),
        )
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<RuntimeSnapshot> {
        self.current.read().clone()
    }

    /// Run the initial build unless some caller already has. Returns `true` when this
    /// call performed it; concurrent callers wait for the first one to finish.
    pub async fn ensure_initialized(&self) -> bool {
        if self.snapshot().is_initialized() {
            return false;
        }
        let _guard = self.rebuild_lock.lock().await;
        // Double-check after acquiring the lock
        if self.snapshot().is_initialized() {
            return false;
        }
        let days = self.config.default_days;
        // Initial builds degrade rather than fail.
        if let Ok(snapshot) = self.build(days, RebuildMode::Initial).await {
            self.install(snapshot);
        }
        true
    }

    /// Re-run ingestion and context construction, then swap the result in.
    pub async fn rebuild(
        &self,
        days: DayRange,
        mode: RebuildMode,
    ) -> Result<Arc<RuntimeSnapshot>, RuntimeError> {
        let _guard = self.rebuild_lock.lock().await;
        let snapshot = self.build(days, mode).await?;
        Ok(self.install(snapshot))
    }

    /// One-off ingestion with the configured source, independent of the active contexts.
    pub async fn ingest(&self, days: DayRange) -> IngestReport {
        hunter_ingest::ingest(LogQuery::from_config(&self.config, days)).await
    }

    async fn build(
        &self,
        days: DayRange,
        mode: RebuildMode,
    ) -> Result<RuntimeSnapshot, RuntimeError> {
        let started = Instant::now();
        let query = LogQuery::from_config(&self.config, days);
        let source = query.source.clone();
        let report = hunter_ingest::ingest(query).await;

        if let Some(failure) = &report.failure {
            match mode {
                RebuildMode::Reload => return Err(failure.clone().into()),
                RebuildMode::Initial => {
                    warn!(error = %failure, "initial ingestion failed, continuing without log evidence")
                }
            }
        }

        let contexts = ContextPair::build(&report.records, self.config.answer_language.as_deref());

        let bridge = match (self.bridge_factory)(&self.config) {
            Ok(bridge) => Some(bridge),
            Err(e) if mode == RebuildMode::Reload => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "model bridge could not be built, runtime not ready");
                None
            }
        };

        info!(
            ?mode,
            days = days.get(),
            records = report.records.len(),
            rendered = contexts.rendered_records,
            degraded = contexts.degraded,
            bridge = bridge.is_some(),
            duration_ms = started.elapsed().as_millis() as u64,
            "runtime rebuilt"
        );

        Ok(RuntimeSnapshot {
            contexts: Some(Arc::new(contexts)),
            bridge,
            default_days: days,
            ingest: Some(IngestSummary::from_report(&source, &report)),
            rebuilt_at: Some(Utc::now()),
        })
    }

    fn install(&self, snapshot: RuntimeSnapshot) -> Arc<RuntimeSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = snapshot.clone();
        snapshot
    }
}
