//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Authenticated WebSocket connections (gauge, labels: role).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Rejected handshakes (counter, labels: kind).
pub const AUTH_FAILURES_TOTAL: &str = "auth_failures_total";
/// Registrations that displaced a live connection (counter, labels: role).
pub const SESSIONS_SUPERSEDED_TOTAL: &str = "sessions_superseded_total";
/// Scan notifications queued for a peer (counter).
pub const SCANS_ROUTED_TOTAL: &str = "scans_routed_total";
/// Scans that produced no notification (counter, labels: reason).
pub const SCANS_DROPPED_TOTAL: &str = "scans_dropped_total";
/// Connections closed for sending an unparseable frame (counter).
pub const PROTOCOL_ERRORS_TOTAL: &str = "protocol_errors_total";
