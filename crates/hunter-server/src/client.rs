use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique client identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }
}

impl ClientId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ClientEntry {
    connected_at: DateTime<Utc>,
    cancel: CancellationToken,
}

/// Live sessions, for health reporting and shutdown.
pub struct SessionRegistry {
    clients: DashMap<ClientId, ClientEntry>,
    shutdown: CancellationToken,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a new client. The returned token is cancelled on shutdown.
    pub fn register(&self) -> (ClientId, CancellationToken) {
        let id = ClientId::new();
        let cancel = self.shutdown.child_token();
        self.clients.insert(
            id.clone(),
            ClientEntry {
                connected_at: Utc::now(),
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    pub fn unregister(&self, id: &ClientId) {
        if let Some((_, entry)) = self.clients.remove(id) {
            entry.cancel.cancel();
            tracing::debug!(
                client_id = %id,
                connected_secs = (Utc::now() - entry.connected_at).num_seconds(),
                "client unregistered"
            );
        }
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Cancel every live session.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
