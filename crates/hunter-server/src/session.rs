//! Per-connection session: command dispatch, readiness tracking and the bounded,
//! cancellable model call.
//!
//! Frames from one connection are handled strictly in order. While a model call is
//! in flight the session services nothing else.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hunter_core::{BridgeError, DayRange, HistoryEntry, ModelBridge, ServiceConfig};
use hunter_engine::{
    classify, compose_prompt, ContextMode, IngestSummary, RebuildMode, RuntimeSnapshot,
    SharedRuntime,
};
use hunter_ingest::LogStats;

use crate::client::ClientId;
use crate::command::Command;
use crate::frame::{ErrorDetails, Frame, FrameStatus};
use crate::transport::{Transport, TransportError, NORMAL_CLOSE};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_REASON: &str = "Session ended normally";

const HELP_TEXT: &str = "Help\n\n\
Modes:\n\
- Security mode is used automatically when your question mentions logs, security, wazuh, \
threat, alert, event, attack, intrusion, firewall, malware, vulnerability, breach, incident, \
monitoring, detection or siem.\n\
- General mode answers anything else.\n\n\
Commands:\n\
/diagnostic - full system diagnostic\n\
/status - quick system status\n\
/reload - reload logs using the current day range\n\
/ping - connectivity check\n\
/set days <n> - set how many days of logs to load (1-365)\n\
/stat - statistics for the logs in the current range\n\
/uptime - session information\n\
/help - this message";

const NOT_READY_TEXT: &str = "The system is not initialized.\n\n\
Available options:\n\
- /reload - try to initialize again\n\
- /diagnostic - full diagnostic\n\
- /status - current state\n\n\
Analysis queries are unavailable until the system is ready.";

const EMPTY_ANSWER_TEXT: &str = "I could not generate an answer for your question.\n\n\
Suggestions:\n\
- Rephrase the question more specifically\n\
- Check that logs exist in the configured day range\n\
- Use /stat to see what is loaded";

const SET_DAYS_USAGE: &str =
    "Invalid format.\nUsage: /set days <number> (between 1 and 365)\nExample: /set days 30";

#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Silence after which a warning frame is sent. The connection stays open.
    pub inactivity_timeout: Duration,
    pub query_timeout: Duration,
    /// Consecutive undeliverable frames that end the session.
    pub max_send_failures: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(300),
            query_timeout: Duration::from_secs(60),
            max_send_failures: 3,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            query_timeout: config.query_timeout,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Init,
    NotReady,
    Ready,
    Processing,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{failures} consecutive frames could not be delivered")]
    Undeliverable { failures: u32 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Errors after which the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// How a model call resolved.
#[derive(Debug)]
pub enum QueryOutcome {
    Answer(String),
    Timeout(Duration),
    BackendError(BridgeError),
}

/// Everything a session tracks about its connection. Never shared.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub client_id: ClientId,
    pub connected_at: DateTime<Utc>,
    pub messages_processed: u64,
    pub last_activity: DateTime<Utc>,
    pub days: DayRange,
    pub history: Vec<HistoryEntry>,
    pub phase: SessionPhase,
}

#[derive(Debug, Serialize)]
struct BackendProbe {
    reachable: bool,
    available_models: Vec<String>,
    target_model_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TrialIngest {
    days: DayRange,
    records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiagnosticReport {
    ready: bool,
    contexts_loaded: bool,
    degraded: bool,
    bridge_configured: bool,
    backend_url: String,
    model: String,
    session_days: DayRange,
    default_days: DayRange,
    connection_secs: u64,
    messages_processed: u64,
    idle_secs: u64,
    last_rebuild: Option<DateTime<Utc>>,
    ingest: Option<IngestSummary>,
    backend: BackendProbe,
    #[serde(skip_serializing_if = "Option::is_none")]
    trial_ingest: Option<TrialIngest>,
}

impl DiagnosticReport {
    fn render(&self, title: &str) -> String {
        let mut out = format!("{title}\n\n");
        out.push_str(&format!("- Ready: {}\n", yes_no(self.ready)));
        out.push_str(&format!(
            "- Security context: {}\n",
            match (self.contexts_loaded, self.degraded) {
                (false, _) => "not loaded",
                (true, true) => "instructions only (no log evidence)",
                (true, false) => "loaded",
            }
        ));
        out.push_str(&format!("- General context: {}\n", loaded(self.contexts_loaded)));
        out.push_str(&format!("- Model bridge: {}\n", loaded(self.bridge_configured)));
        match &self.backend.error {
            None => out.push_str(&format!(
                "- Backend {}: connected ({} models)\n",
                self.backend_url,
                self.backend.available_models.len()
            )),
            Some(e) => out.push_str(&format!("- Backend {}: unreachable ({e})\n", self.backend_url)),
        }
        out.push_str(&format!(
            "- Target model {}: {}\n",
            self.model,
            if self.backend.target_model_available { "available" } else { "not found" }
        ));
        out.push_str(&format!(
            "- Day range: {} (shared default {})\n",
            self.session_days, self.default_days
        ));
        if let Some(ingest) = &self.ingest {
            out.push_str(&format!(
                "- Last ingestion: {} records from {} of {} days ({})\n",
                ingest.records, ingest.days_loaded, ingest.days_scanned, ingest.source
            ));
            if let Some(failure) = &ingest.failure {
                out.push_str(&format!("- Last ingestion failure: {failure}\n"));
            }
        }
        out.push_str(&format!(
            "- Connected for: {}\n",
            human_duration(Duration::from_secs(self.connection_secs))
        ));
        out.push_str(&format!("- Messages processed: {}\n", self.messages_processed));
        if let Some(trial) = &self.trial_ingest {
            match &trial.failure {
                None => out.push_str(&format!(
                    "- Log test ({} day): {} records\n",
                    trial.days, trial.records
                )),
                Some(e) => out.push_str(&format!("- Log test ({} day): failed ({e})\n", trial.days)),
            }
        }
        out
    }
}

pub struct Session<T> {
    transport: T,
    runtime: Arc<SharedRuntime>,
    settings: SessionSettings,
    cancel: CancellationToken,
    state: SessionState,
    started: Instant,
    send_failures: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(
        client_id: ClientId,
        transport: T,
        runtime: Arc<SharedRuntime>,
        settings: SessionSettings,
        cancel: CancellationToken,
    ) -> Self {
        let now = Utc::now();
        let days = runtime.snapshot().default_days;
        Self {
            transport,
            runtime,
            settings,
            cancel,
            state: SessionState {
                client_id,
                connected_at: now,
                messages_processed: 0,
                last_activity: now,
                days,
                history: Vec::new(),
                phase: SessionPhase::Init,
            },
            started: Instant::now(),
            send_failures: 0,
        }
    }

    /// Drive the session until disconnect, shutdown, or repeated delivery failure.
    pub async fn run(mut self) -> SessionState {
        match self.drive().await {
            Ok(()) => info!(
                client_id = %self.state.client_id,
                messages = self.state.messages_processed,
                "session ended"
            ),
            Err(e) => warn!(
                client_id = %self.state.client_id,
                error = %e,
                "session terminated"
            ),
        }
        self.set_phase(SessionPhase::Closed);
        if let Err(e) = self.transport.close(NORMAL_CLOSE, CLOSE_REASON).await {
            debug!(client_id = %self.state.client_id, error = %e, "close handshake failed");
        }
        self.state
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.on_connect().await?;

        loop {
            let inbound = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                r = tokio::time::timeout(self.settings.inactivity_timeout, self.transport.recv()) => r,
            };

            let text = match inbound {
                Err(_elapsed) => {
                    self.send(Frame::system(
                        FrameStatus::TimeoutWarning,
                        format!(
                            "No message received in {}. Send /ping to keep the connection alive.",
                            human_duration(self.settings.inactivity_timeout)
                        ),
                    ))
                    .await?;
                    continue;
                }
                Ok(None) => return Ok(()),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(text))) => text,
            };

            self.state.messages_processed += 1;
            self.state.last_activity = Utc::now();

            let command = Command::parse(&text);
            if command == Command::Empty {
                continue;
            }

            let history_len = self.state.history.len();
            let handled = AssertUnwindSafe(self.handle(command)).catch_unwind().await;
            let failure = match handled {
                Ok(Ok(())) => continue,
                Ok(Err(e)) if e.is_fatal() => return Err(e),
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panic: {}", panic_message(&*panic)),
            };

            error!(client_id = %self.state.client_id, error = %failure, "message handling failed");
            self.state.history.truncate(history_len);
            let snapshot = self.runtime.snapshot();
            self.refresh_phase(&snapshot);
            self.send(
                Frame::system(
                    FrameStatus::LoopError,
                    format!(
                        "Internal error while handling your message: {failure}\n\n\
                         The connection stays open. Use /diagnostic for more information."
                    ),
                )
                .with_error(ErrorDetails::new("loop_error", failure)),
            )
            .await?;
        }
    }

    async fn on_connect(&mut self) -> Result<(), SessionError> {
        info!(client_id = %self.state.client_id, "session started");

        if !self.runtime.snapshot().is_initialized() {
            self.send(Frame::system(
                FrameStatus::Initializing,
                "The assistant is not ready yet. Loading logs and connecting to the model...",
            ))
            .await?;
            self.runtime.ensure_initialized().await;
            let snapshot = self.runtime.snapshot();
            let report = self.diagnostic_report(&snapshot, false).await;
            let diagnostic = to_json(&report)?;
            self.send(
                Frame::system(FrameStatus::Diagnostic, report.render("Initialization finished"))
                    .with_diagnostic(diagnostic),
            )
            .await?;
        }

        let snapshot = self.runtime.snapshot();
        self.state.days = snapshot.default_days;
        self.refresh_phase(&snapshot);
        if let (true, Some(contexts)) = (snapshot.is_ready(), &snapshot.contexts) {
            self.state.history = vec![HistoryEntry::system(contexts.general.clone())];
        }

        let ready = snapshot.is_ready();
        let welcome = format!(
            "Hello! I am a threat-hunting assistant.\n\
             Security mode: mention logs, security, wazuh or threats to analyze the loaded events.\n\
             General mode: for any other question.\n\
             Log range: {} days\n\
             State: {}\n\
             Type /help to see the available commands.",
            self.state.days,
            if ready { "ready" } else { "diagnostic mode (limited)" }
        );
        let status = if ready { FrameStatus::Ready } else { FrameStatus::Limited };
        self.send(Frame::bot(status, welcome)).await
    }

    async fn handle(&mut self, command: Command) -> Result<(), SessionError> {
        debug!(client_id = %self.state.client_id, ?command, "handling message");
        match command {
            Command::Empty => Ok(()),
            Command::Ping => self.ping().await,
            Command::Help => self.send(Frame::bot(FrameStatus::Help, HELP_TEXT)).await,
            Command::Uptime => self.uptime().await,
            Command::Status => self.status(false).await,
            Command::Diagnostic => self.status(true).await,
            Command::Reload => self.reload().await,
            Command::SetDays(days) => {
                self.state.days = days;
                self.send(Frame::bot(
                    FrameStatus::DaysUpdated,
                    format!("Range set to {days} days.\nUse /reload to apply the change."),
                ))
                .await
            }
            Command::MalformedSetDays => {
                self.send(Frame::bot(FrameStatus::InvalidCommand, SET_DAYS_USAGE))
                    .await
            }
            Command::Stat => self.stat().await,
            Command::Query(query) => self.answer(query).await,
        }
    }

    async fn ping(&mut self) -> Result<(), SessionError> {
        let message = format!(
            "pong - connection alive (uptime: {}, messages: {})",
            human_duration(self.started.elapsed()),
            self.state.messages_processed
        );
        self.send(Frame::system(FrameStatus::Heartbeat, message)).await
    }

    async fn uptime(&mut self) -> Result<(), SessionError> {
        let ready = self.runtime.snapshot().is_ready();
        let message = format!(
            "Session information\n\n\
             - Connected at: {}\n\
             - Active for: {}\n\
             - Messages processed: {}\n\
             - Last activity: {}\n\
             - System state: {}",
            self.state.connected_at.format("%Y-%m-%d %H:%M:%S"),
            human_duration(self.started.elapsed()),
            self.state.messages_processed,
            self.state.last_activity.format("%H:%M:%S"),
            if ready { "operational" } else { "limited" }
        );
        self.send(Frame::bot(FrameStatus::Uptime, message)).await
    }

    /// `status` (quick) or `diagnostic` (adds a one-day trial ingestion).
    async fn status(&mut self, full: bool) -> Result<(), SessionError> {
        let snapshot = self.runtime.snapshot();
        self.refresh_phase(&snapshot);
        let report = self.diagnostic_report(&snapshot, full).await;
        let diagnostic = to_json(&report)?;
        let (status, title) = if full {
            (FrameStatus::DiagnosticComplete, "Full system diagnostic")
        } else {
            (FrameStatus::Status, "Quick system status")
        };
        self.send(Frame::system(status, report.render(title)).with_diagnostic(diagnostic))
            .await
    }

    async fn reload(&mut self) -> Result<(), SessionError> {
        let days = self.state.days;
        self.send(Frame::bot(
            FrameStatus::Reloading,
            format!("Reloading logs from the last {days} days..."),
        ))
        .await?;

        match self.runtime.rebuild(days, RebuildMode::Reload).await {
            Ok(snapshot) => {
                if let Some(contexts) = &snapshot.contexts {
                    self.state.history = vec![HistoryEntry::system(contexts.general.clone())];
                }
                self.refresh_phase(&snapshot);
                let records = snapshot.ingest.as_ref().map_or(0, |i| i.records);
                self.send(Frame::bot(
                    FrameStatus::ReloadSuccess,
                    format!(
                        "Reload complete.\nNow using logs from the last {days} days ({records} records)."
                    ),
                ))
                .await
            }
            Err(e) => {
                warn!(client_id = %self.state.client_id, error = %e, "reload failed");
                let snapshot = self.runtime.snapshot();
                let report = self.diagnostic_report(&snapshot, false).await;
                let diagnostic = to_json(&report)?;
                self.send(
                    Frame::bot(
                        FrameStatus::ReloadFailed,
                        format!(
                            "Reload failed: {e}\nThe previous state is still active.\n\n\
                             Use /diagnostic for a full analysis."
                        ),
                    )
                    .with_error(ErrorDetails::new(e.error_kind(), e.to_string()))
                    .with_diagnostic(diagnostic),
                )
                .await
            }
        }
    }

    async fn stat(&mut self) -> Result<(), SessionError> {
        let days = self.state.days;
        self.send(Frame::system(FrameStatus::LoadingStats, "Loading statistics..."))
            .await?;

        let report = self.runtime.ingest(days).await;
        if let Some(failure) = &report.failure {
            return self
                .send(
                    Frame::bot(
                        FrameStatus::StatsError,
                        format!("Could not load statistics: {failure}"),
                    )
                    .with_error(ErrorDetails::new(failure.error_kind(), failure.to_string())),
                )
                .await;
        }

        let stats = LogStats::summarize(&report.records);
        let mut message = format!("Log statistics\n\nLogs loaded: {}", stats.total);
        if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
            message.push_str(&format!(" from {earliest} to {latest}"));
        }
        if let Some(mean) = stats.mean_record_bytes {
            message.push_str(&format!(
                "\n\nDetails:\n- Mean size per log: {mean} bytes\n- Sample fields: {}\n- Configured range: {days} days",
                stats.sample_fields.join(", ")
            ));
        }
        let diagnostic = to_json(&stats)?;
        self.send(Frame::bot(FrameStatus::StatsComplete, message).with_diagnostic(diagnostic))
            .await
    }

    async fn answer(&mut self, query: String) -> Result<(), SessionError> {
        let snapshot = self.runtime.snapshot();
        let (Some(contexts), Some(bridge)) = (snapshot.contexts.clone(), snapshot.bridge.clone())
        else {
            self.set_phase(SessionPhase::NotReady);
            return self
                .send(Frame::bot(FrameStatus::SystemNotReady, NOT_READY_TEXT))
                .await;
        };

        let mode = classify(&query);
        let prompt = compose_prompt(contexts.select(mode), &query);
        let rollback_len = self.state.history.len();
        self.state.history.push(HistoryEntry::user(query.as_str()));
        self.set_phase(SessionPhase::Processing);
        info!(
            client_id = %self.state.client_id,
            mode = mode.as_str(),
            query_len = query.len(),
            "query received"
        );

        self.send(
            Frame::system(FrameStatus::Processing, "Analyzing logs and generating an answer...")
                .with_mode(mode),
        )
        .await?;

        let started = Instant::now();
        let outcome = self.invoke(bridge.as_ref(), &prompt).await;
        self.refresh_phase(&snapshot);

        match outcome {
            QueryOutcome::Answer(raw) => {
                let answer = tidy_answer(&raw);
                self.state.history.push(HistoryEntry::assistant(answer.as_str()));
                info!(
                    client_id = %self.state.client_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "query answered"
                );
                self.send(
                    Frame::bot(
                        FrameStatus::ResponseComplete,
                        format!("{}\n\n{answer}", mode_label(mode)),
                    )
                    .with_mode(mode)
                    .with_elapsed(started.elapsed()),
                )
                .await
            }
            QueryOutcome::Timeout(limit) => {
                self.state.history.truncate(rollback_len);
                warn!(client_id = %self.state.client_id, timeout_secs = limit.as_secs(), "query timed out");
                self.send(Frame::bot(
                    FrameStatus::TimeoutError,
                    format!(
                        "Timeout: the query took longer than {}.\n\n\
                         Possible causes:\n\
                         - The question is too complex for the model\n\
                         - Connectivity problems with the model server\n\
                         - A very large volume of logs\n\n\
                         Suggestions:\n\
                         - Ask a more specific question\n\
                         - Try again in a moment\n\
                         - Reduce the day range with /set days <number>\n\
                         - Check the system with /diagnostic",
                        human_duration(limit)
                    ),
                ))
                .await
            }
            QueryOutcome::BackendError(e) => {
                self.state.history.truncate(rollback_len);
                warn!(
                    client_id = %self.state.client_id,
                    error_kind = e.error_kind(),
                    error = %e,
                    "query failed"
                );
                self.send(
                    Frame::bot(
                        FrameStatus::ProcessingError,
                        format!(
                            "Error processing your question: {e}\n\n\
                             Recommended actions:\n\
                             - Check the system state: /status\n\
                             - Try reloading: /reload\n\
                             - If it persists: /diagnostic"
                        ),
                    )
                    .with_error(ErrorDetails::new(e.error_kind(), e.to_string()).for_question(&query)),
                )
                .await
            }
        }
    }

    /// One bounded, cancellable model call.
    async fn invoke(&mut self, bridge: &dyn ModelBridge, prompt: &str) -> QueryOutcome {
        let limit = self.settings.query_timeout;
        tokio::select! {
            _ = self.cancel.cancelled() => QueryOutcome::BackendError(BridgeError::Cancelled),
            r = tokio::time::timeout(limit, bridge.invoke(prompt)) => match r {
                Err(_elapsed) => QueryOutcome::Timeout(limit),
                Ok(Ok(answer)) => QueryOutcome::Answer(answer),
                Ok(Err(e)) if e.is_timeout() => QueryOutcome::Timeout(limit),
                Ok(Err(e)) => QueryOutcome::BackendError(e),
            },
        }
    }

    async fn diagnostic_report(&mut self, snapshot: &RuntimeSnapshot, trial: bool) -> DiagnosticReport {
        let config = self.runtime.config();
        // The active bridge is authoritative; config only describes what a rebuild would use.
        let (backend_url, model) = match &snapshot.bridge {
            Some(bridge) => (bridge.endpoint().to_string(), bridge.model().to_string()),
            None => (config.backend_url.clone(), config.model.clone()),
        };
        let backend = match &snapshot.bridge {
            Some(bridge) => probe(bridge.as_ref()).await,
            None => BackendProbe {
                reachable: false,
                available_models: Vec::new(),
                target_model_available: false,
                error: Some("no model bridge configured".into()),
            },
        };

        let trial_ingest = if trial {
            let days = DayRange::default();
            let report = self.runtime.ingest(days).await;
            Some(TrialIngest {
                days,
                records: report.records.len(),
                failure: report.failure.map(|f| f.to_string()),
            })
        } else {
            None
        };

        let idle = (Utc::now() - self.state.last_activity).to_std().unwrap_or_default();
        DiagnosticReport {
            ready: snapshot.is_ready(),
            contexts_loaded: snapshot.contexts.is_some(),
            degraded: snapshot.is_degraded(),
            bridge_configured: snapshot.bridge.is_some(),
            backend_url,
            model,
            session_days: self.state.days,
            default_days: snapshot.default_days,
            connection_secs: self.started.elapsed().as_secs(),
            messages_processed: self.state.messages_processed,
            idle_secs: idle.as_secs(),
            last_rebuild: snapshot.rebuilt_at,
            ingest: snapshot.ingest.clone(),
            backend,
            trial_ingest,
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<(), SessionError> {
        match self.transport.send(&frame).await {
            Ok(()) => {
                self.send_failures = 0;
                Ok(())
            }
            Err(e) => {
                self.send_failures += 1;
                warn!(
                    client_id = %self.state.client_id,
                    status = ?frame.status,
                    failures = self.send_failures,
                    error = %e,
                    "frame not delivered"
                );
                if self.send_failures >= self.settings.max_send_failures {
                    Err(SessionError::Undeliverable {
                        failures: self.send_failures,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn refresh_phase(&mut self, snapshot: &RuntimeSnapshot) {
        let next = if snapshot.is_ready() {
            SessionPhase::Ready
        } else {
            SessionPhase::NotReady
        };
        self.set_phase(next);
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.state.phase != next {
            debug!(
                client_id = %self.state.client_id,
                from = ?self.state.phase,
                to = ?next,
                "session phase changed"
            );
            self.state.phase = next;
        }
    }
}

async fn probe(bridge: &dyn ModelBridge) -> BackendProbe {
    match tokio::time::timeout(PROBE_TIMEOUT, bridge.probe()).await {
        Ok(Ok(report)) => BackendProbe {
            reachable: true,
            available_models: report.available_models,
            target_model_available: report.target_model_available,
            error: None,
        },
        Ok(Err(e)) => BackendProbe {
            reachable: false,
            available_models: Vec::new(),
            target_model_available: false,
            error: Some(e.to_string()),
        },
        Err(_elapsed) => BackendProbe {
            reachable: false,
            available_models: Vec::new(),
            target_model_available: false,
            error: Some(format!("no answer within {}s", PROBE_TIMEOUT.as_secs())),
        },
    }
}

/// Unescape literal `\n` sequences and trim; an empty answer becomes a suggestion.
fn tidy_answer(raw: &str) -> String {
    let answer = raw.replace("\\n", "\n");
    let answer = answer.trim();
    if answer.is_empty() {
        EMPTY_ANSWER_TEXT.to_string()
    } else {
        answer.to_string()
    }
}

fn mode_label(mode: ContextMode) -> &'static str {
    match mode {
        ContextMode::Domain => "Security mode: analyzing security logs",
        ContextMode::General => "General mode: general assistant",
    }
}

fn to_json<S: Serialize>(value: &S) -> Result<serde_json::Value, SessionError> {
    serde_json::to_value(value).map_err(|e| SessionError::Internal(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, 1, 0) => "1 minute".to_string(),
        (0, m, 0) => format!("{m} minutes"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

fn loaded(v: bool) -> &'static str {
    if v {
        "loaded"
    } else {
        "not loaded"
    }
}
