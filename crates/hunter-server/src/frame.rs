use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use hunter_engine::ContextMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRole {
    System,
    Bot,
}

/// Machine-readable tag on every outbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Initializing,
    Diagnostic,
    Ready,
    Limited,
    TimeoutWarning,
    Heartbeat,
    Help,
    Uptime,
    Status,
    DiagnosticComplete,
    Reloading,
    ReloadSuccess,
    ReloadFailed,
    DaysUpdated,
    InvalidCommand,
    LoadingStats,
    StatsComplete,
    StatsError,
    SystemNotReady,
    Processing,
    ResponseComplete,
    TimeoutError,
    ProcessingError,
    LoopError,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorDetails {
    pub error_type: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorDetails {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
            question: None,
            timestamp: Utc::now(),
        }
    }

    pub fn for_question(mut self, question: &str) -> Self {
        self.question = Some(question.to_string());
        self
    }
}

/// Outbound JSON frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub role: FrameRole,
    pub message: String,
    pub status: FrameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ContextMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl Frame {
    fn new(role: FrameRole, status: FrameStatus, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            status,
            mode: None,
            diagnostic: None,
            error_details: None,
            elapsed_ms: None,
        }
    }

    pub fn system(status: FrameStatus, message: impl Into<String>) -> Self {
        Self::new(FrameRole::System, status, message)
    }

    pub fn bot(status: FrameStatus, message: impl Into<String>) -> Self {
        Self::new(FrameRole::Bot, status, message)
    }

    pub fn with_mode(mut self, mode: ContextMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: serde_json::Value) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }

    pub fn with_error(mut self, details: ErrorDetails) -> Self {
        self.error_details = Some(details);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        self
    }
}
