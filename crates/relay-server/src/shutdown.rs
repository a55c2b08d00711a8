//! Graceful shutdown: stop accepting, close every session, wait for the
//! registry to drain.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::registry::SessionRegistry;

/// How long to wait for sessions to close before giving up.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry poll interval while draining.
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Owns the server-wide shutdown token.
///
/// Every session holds a clone and enters its closing path (close code
/// 1001) once the token is cancelled.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the token, for the listener and each session.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every holder of the token. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then wait up to `timeout` for the serve tasks in
    /// `handles` to finish and for `registry` to empty.
    ///
    /// Returns how many sessions were still registered when waiting stopped.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        registry: &SessionRegistry,
        timeout: Option<Duration>,
    ) -> usize {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(
            sessions = registry.total(),
            timeout_secs = timeout.as_secs(),
            "closing sessions"
        );

        let drain = async {
            let _ = futures::future::join_all(handles).await;
            while registry.total() > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        };
        let remaining = if tokio::time::timeout(timeout, drain).await.is_ok() {
            0
        } else {
            registry.total()
        };

        if remaining > 0 {
            warn!(remaining, "shutdown timed out after {timeout:?} with sessions still open");
        }
        remaining
    }
}
