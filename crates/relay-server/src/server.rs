//! `RelayServer`: Axum HTTP + WebSocket server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Json, Response};
use axum::routing::get;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use relay_auth::CredentialValidator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::registry::SessionRegistry;
use crate::router::ScanRouter;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::connection::ConnectionId;
use crate::websocket::handshake::extract_token;
use crate::websocket::session::{SessionContext, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Per-session dependencies.
    pub session: SessionContext,
    /// Handshake credential validator.
    pub validator: Arc<CredentialValidator>,
    /// When the server started.
    pub start_time: Instant,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Prometheus handle, if a recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    router: Arc<ScanRouter>,
    validator: Arc<CredentialValidator>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl RelayServer {
    /// Create a new server with an empty registry.
    pub fn new(
        config: ServerConfig,
        validator: CredentialValidator,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            config,
            router: Arc::new(ScanRouter::new(registry.clone())),
            registry,
            validator: Arc::new(validator),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            session: SessionContext {
                registry: self.registry.clone(),
                router: self.router.clone(),
                // A zero-capacity channel cannot be built.
                max_send_queue: self.config.max_send_queue.max(1),
                shutdown: self.shutdown.token(),
            },
            validator: self.validator.clone(),
            start_time: self.start_time,
            max_message_size: self.config.max_message_size,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, "relay listening");
        Ok((addr, handle))
    }

    /// Get the session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws: validate the handshake credential, then upgrade.
///
/// The socket is upgraded even when validation fails so the client receives
/// a policy-violation close frame instead of a bare HTTP error.
async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let token = extract_token(&headers, &query);
    let credential = state.validator.validate(token.as_deref(), Utc::now());
    let conn_id = ConnectionId::new();
    let ctx = state.session;

    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            // Outcome is logged and counted inside the session.
            let _ = run_ws_session(socket, conn_id, credential, ctx).await;
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        &state.session.registry,
    ))
}

/// GET /metrics
///
/// Empty body when no recorder was installed.
async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(crate::metrics::render)
        .unwrap_or_default()
}
