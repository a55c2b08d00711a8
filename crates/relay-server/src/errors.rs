//! Why a session ended abnormally.

use relay_auth::AuthError;
use relay_core::ProtocolError;

/// A condition that terminated a connection.
///
/// A clean close (peer close frame, end of stream, server shutdown) is not
/// an error and is reported as `Ok(())` by the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The handshake credential was rejected.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The client sent a frame that is not a JSON object.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The underlying WebSocket failed.
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
}

impl SessionError {
    /// Short stable label for logs and metrics.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Protocol(_) => "protocol",
            Self::Transport(_) => "transport",
        }
    }
}
