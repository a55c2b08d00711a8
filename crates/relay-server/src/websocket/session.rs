//! Session supervisor for one client, from upgrade through disconnect.
//!
//! ```text
//! Connecting ──auth ok──▶ Active ──close / error / shutdown──▶ Closing
//!      │                                                        ▲
//!      └────────────────────auth failed─────────────────────────┘
//! ```
//!
//! Registration is held by a [`Registration`] guard, so the registry entry
//! is removed exactly once whichever way the session ends, including a
//! panic in the receive loop.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use relay_auth::{AuthError, CredentialClaim};
use relay_core::{Role, ScanEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, instrument, warn};

use crate::errors::SessionError;
use crate::metrics::{
    AUTH_FAILURES_TOTAL, PROTOCOL_ERRORS_TOTAL, SESSIONS_SUPERSEDED_TOTAL,
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::registry::SessionRegistry;
use crate::router::ScanRouter;

use super::connection::{ConnectionId, PeerConnection};

/// Dependencies shared by every session.
#[derive(Clone)]
pub struct SessionContext {
    /// Live sessions by role and id.
    pub registry: Arc<SessionRegistry>,
    /// Scan router over the same registry.
    pub router: Arc<ScanRouter>,
    /// Outbound queue depth per connection.
    pub max_send_queue: usize,
    /// Server-wide shutdown signal.
    pub shutdown: CancellationToken,
}

/// Why an Active session stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClosedBy {
    /// Close frame or end of stream from the client.
    Peer,
    /// Server is shutting down.
    Shutdown,
}

/// Registry entry owned by an Active session. Dropping it removes the
/// entry, unless a newer connection has since taken the same id.
struct Registration {
    registry: Arc<SessionRegistry>,
    role: Role,
    id: String,
    conn_id: ConnectionId,
}

impl Registration {
    fn register(
        registry: Arc<SessionRegistry>,
        claim: &CredentialClaim,
        connection: Arc<PeerConnection>,
    ) -> Self {
        let conn_id = connection.id.clone();
        if let Some(previous) = registry.register(claim.role, claim.id.clone(), connection) {
            info!(
                role = %claim.role,
                id = %claim.id,
                superseded = %previous.id,
                "replaced existing session for id"
            );
            counter!(SESSIONS_SUPERSEDED_TOTAL, "role" => claim.role.as_str()).increment(1);
        }
        gauge!(WS_CONNECTIONS_ACTIVE, "role" => claim.role.as_str()).increment(1.0);
        Self {
            registry,
            role: claim.role,
            id: claim.id.clone(),
            conn_id,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let removed = self
            .registry
            .unregister_if_current(self.role, &self.id, &self.conn_id);
        gauge!(WS_CONNECTIONS_ACTIVE, "role" => self.role.as_str()).decrement(1.0);
        debug!(role = %self.role, id = %self.id, removed, "session unregistered");
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Rejects the connection (close code 1008) if `credential` is an error
/// 2. Registers the connection under the claim's `(role, id)`
/// 3. Routes every inbound JSON object through the [`ScanRouter`]
/// 4. Forwards queued notifications to the socket from a writer task
/// 5. Unregisters and closes the socket on close, error, or shutdown
///
/// Returns `Ok(())` for a clean close and the terminating error otherwise.
#[instrument(
    skip_all,
    fields(conn_id = %conn_id, role = tracing::field::Empty, id = tracing::field::Empty)
)]
pub async fn run_ws_session(
    mut ws: WebSocket,
    conn_id: ConnectionId,
    credential: Result<CredentialClaim, AuthError>,
    ctx: SessionContext,
) -> Result<(), SessionError> {
    counter!(WS_CONNECTIONS_TOTAL).increment(1);

    let claim = match credential {
        Ok(claim) => claim,
        Err(err) => {
            warn!(error = %err, "rejecting connection");
            counter!(AUTH_FAILURES_TOTAL, "kind" => err.kind()).increment(1);
            counter!(WS_DISCONNECTIONS_TOTAL, "reason" => "auth").increment(1);
            let frame = CloseFrame {
                code: close_code::POLICY,
                reason: "unauthorized".into(),
            };
            let _ = ws.send(Message::Close(Some(frame))).await;
            let _ = SinkExt::close(&mut ws).await;
            return Err(err.into());
        }
    };

    let span = Span::current();
    let _ = span.record("role", claim.role.as_str());
    let _ = span.record("id", claim.id.as_str());
    info!("client authenticated");

    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(ctx.max_send_queue);
    let connection = Arc::new(PeerConnection::new(conn_id, send_tx));
    let registration = Registration::register(ctx.registry.clone(), &claim, connection.clone());

    let (ws_tx, mut ws_rx) = ws.split();
    let stop = CancellationToken::new();
    let writer = tokio::spawn(write_outbound(ws_tx, send_rx, stop.clone()));

    let result = read_inbound(&mut ws_rx, claim.role, &ctx).await;

    // Closing: unregister first so no new scan can be routed here.
    drop(registration);
    stop.cancel();
    if let Ok(mut ws_tx) = writer.await {
        if let Some(frame) = close_frame(&result) {
            let _ = ws_tx.send(Message::Close(Some(frame))).await;
        }
        let _ = ws_tx.close().await;
    }

    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    let dropped = connection.drop_count();
    match &result {
        Ok(closed_by) => {
            counter!(WS_DISCONNECTIONS_TOTAL, "reason" => closed_by.reason()).increment(1);
            info!(?closed_by, dropped, "client disconnected");
        }
        Err(err) => {
            if matches!(err, SessionError::Protocol(_)) {
                counter!(PROTOCOL_ERRORS_TOTAL).increment(1);
            }
            counter!(WS_DISCONNECTIONS_TOTAL, "reason" => err.reason()).increment(1);
            warn!(error = %err, dropped, "client disconnected with error");
        }
    }
    result.map(|_| ())
}

impl ClosedBy {
    const fn reason(self) -> &'static str {
        match self {
            Self::Peer => "peer",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Receive loop for an Active session.
async fn read_inbound(
    ws_rx: &mut SplitStream<WebSocket>,
    role: Role,
    ctx: &SessionContext,
) -> Result<ClosedBy, SessionError> {
    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = ctx.shutdown.cancelled() => return Ok(ClosedBy::Shutdown),
        };
        let Some(frame) = frame else {
            return Ok(ClosedBy::Peer);
        };

        let event = match frame? {
            Message::Text(text) => ScanEvent::parse(text.as_str())?,
            Message::Binary(data) => ScanEvent::parse_bytes(&data)?,
            Message::Close(frame) => {
                debug!(?frame, "client sent close frame");
                return Ok(ClosedBy::Peer);
            }
            // Pings are answered by the transport.
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let outcome = ctx.router.route(role, &event);
        debug!(?outcome, "scan routed");
    }
}

/// Drain queued notifications into the socket until stopped.
///
/// Hands the sink back so the session can send its close frame.
async fn write_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
    stop: CancellationToken,
) -> SplitSink<WebSocket, Message> {
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(text) => {
                    if let Err(e) = ws_tx.send(Message::Text(String::clone(&text).into())).await {
                        debug!(error = %e, "outbound write failed");
                        break;
                    }
                }
                None => break,
            },
            () = stop.cancelled() => break,
        }
    }
    ws_tx
}

/// Close frame to send for a given session outcome, if any.
fn close_frame(result: &Result<ClosedBy, SessionError>) -> Option<CloseFrame> {
    let (code, reason) = match result {
        // The transport already answered the client's close.
        Ok(ClosedBy::Peer) | Err(SessionError::Transport(_)) => return None,
        Ok(ClosedBy::Shutdown) => (close_code::AWAY, "server shutting down"),
        Err(SessionError::Protocol(_)) => (close_code::UNSUPPORTED, "malformed message"),
        Err(SessionError::Auth(_)) => (close_code::POLICY, "unauthorized"),
    };
    Some(CloseFrame {
        code,
        reason: reason.into(),
    })
}
