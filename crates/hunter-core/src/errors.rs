use std::time::Duration;

/// Failure of a model bridge call. Timeouts are kept distinct from backend failures.
#[derive(Clone, Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("backend error {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("bridge misconfigured: {0}")]
    Config(String),
    #[error("cancelled")]
    Cancelled,
}

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Short classification string for logging and client-facing error summaries.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network_error",
            Self::Backend { .. } => "backend_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config(_) => "config_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classify a non-success HTTP status returned by the backend.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            408 | 504 => Self::Timeout(Duration::ZERO),
            _ => Self::Backend { status, body },
        }
    }
}

/// Connection-level failure of an ingestion call. Per-line and per-day problems never
/// surface as this type; they are skipped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("could not resolve or connect to {host}: {reason}")]
    Connect { host: String, reason: String },
    #[error("ssh handshake with {host} failed: {reason}")]
    Handshake { host: String, reason: String },
    #[error("host key for {host} rejected: {reason}")]
    HostKey { host: String, reason: String },
    #[error("authentication as {user} failed: {reason}")]
    Auth { user: String, reason: String },
    #[error("sftp subsystem unavailable: {0}")]
    Sftp(String),
    #[error("ingestion task failed: {0}")]
    Task(String),
}

impl IngestError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Handshake { .. } => "handshake",
            Self::HostKey { .. } => "host_key",
            Self::Auth { .. } => "auth",
            Self::Sftp(_) => "sftp",
            Self::Task(_) => "task",
        }
    }
}
