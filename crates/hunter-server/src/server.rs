use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hunter_core::ServiceConfig;
use hunter_engine::SharedRuntime;

use crate::auth;
use crate::client::SessionRegistry;
use crate::session::{Session, SessionSettings};
use crate::transport::WsTransport;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub session: SessionSettings,
    /// When set, connecting clients must present this credential.
    pub api_key: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            session: SessionSettings::default(),
            api_key: None,
        }
    }
}

impl ServerConfig {
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            port: config.port,
            session: SessionSettings::from_config(config),
            api_key: config.api_key.clone(),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SharedRuntime>,
    pub registry: Arc<SessionRegistry>,
    pub api_key: Option<Arc<SecretString>>,
    pub settings: SessionSettings,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    message: &'static str,
    backend_url: String,
    model: String,
    ready: bool,
    active_sessions: usize,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/chat", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve. The runtime is initialized lazily by the first session.
pub async fn start(
    config: ServerConfig,
    runtime: Arc<SharedRuntime>,
) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(SessionRegistry::new());
    let state = AppState {
        runtime,
        registry: Arc::clone(&registry),
        api_key: config.api_key.map(Arc::new),
        settings: config.session,
    };
    if state.api_key.is_none() {
        warn!("no API key configured, chat endpoint accepts any client");
    }

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(port = local_addr.port(), "threat hunter server started");

    let shutdown = CancellationToken::new();
    let stop = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
        {
            warn!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        shutdown,
        server,
    })
}

/// Handle returned by `start()`; keeps the server task alive.
pub struct ServerHandle {
    pub port: u16,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections, end live sessions and wait for the server to drain.
    pub async fn shutdown(self) {
        info!(sessions = self.registry.count(), "shutting down");
        self.registry.shutdown();
        self.shutdown.cancel();
        if let Err(e) = self.server.await {
            warn!(error = %e, "server task failed");
        }
    }
}

/// WebSocket upgrade handler. Rejects the upgrade when a key is configured and the
/// client did not present it.
async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    if let Some(expected) = &state.api_key {
        let presented =
            auth::presented_credential(&headers, params.get("token").map(String::as_str));
        let accepted = presented.is_some_and(|p| auth::credential_matches(&p, expected));
        if !accepted {
            warn!("rejected chat connection with missing or invalid credential");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one session to completion over an upgraded socket.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, cancel) = state.registry.register();
    info!(client_id = %client_id, active = state.registry.count(), "chat client connected");

    let session = Session::new(
        client_id.clone(),
        WsTransport::new(socket),
        Arc::clone(&state.runtime),
        state.settings.clone(),
        cancel,
    );
    let summary = session.run().await;

    state.registry.unregister(&client_id);
    info!(
        client_id = %client_id,
        messages = summary.messages_processed,
        history = summary.history.len(),
        "chat client disconnected"
    );
}

/// Liveness plus a readiness summary. Always 200.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.runtime.config();
    Json(HealthResponse {
        message: "Health Check",
        backend_url: config.backend_url.clone(),
        model: config.model.clone(),
        ready: state.runtime.snapshot().is_ready(),
        active_sessions: state.registry.count(),
    })
}
