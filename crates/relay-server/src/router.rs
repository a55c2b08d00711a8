//! Scan routing: resolve the peer named in a scan and notify it.

use std::sync::Arc;

use metrics::counter;
use relay_core::{Notification, Role, ScanEvent};
use tracing::{debug, warn};

use crate::metrics::{SCANS_DROPPED_TOTAL, SCANS_ROUTED_TOTAL};
use crate::registry::SessionRegistry;

/// What happened to one scan event. None of these are errors for the
/// sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The notification was queued on the peer's connection.
    Delivered {
        /// Peer the notification went to.
        peer_id: String,
    },
    /// The message had no usable peer-reference field.
    NoPeerReference,
    /// Nobody is registered under the referenced id.
    PeerOffline {
        /// The id that missed.
        peer_id: String,
    },
    /// The peer was registered but its connection refused the message.
    DeliveryFailed {
        /// Peer whose connection refused the message.
        peer_id: String,
    },
}

impl RouteOutcome {
    /// Whether a notification was queued.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Routes scan events into the opposite role's table.
pub struct ScanRouter {
    registry: Arc<SessionRegistry>,
    notification: Arc<String>,
}

impl ScanRouter {
    /// Router over a shared registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            notification: Arc::new(Notification::SCANNED.to_json()),
        }
    }

    /// Route one event from a `sender` role.
    ///
    /// Lookup-then-send with no lock across the two; if the peer
    /// disconnects in between, the send fails and is swallowed.
    pub fn route(&self, sender: Role, event: &ScanEvent) -> RouteOutcome {
        let Some(peer_id) = event.peer_reference(sender) else {
            debug!(%sender, field = sender.peer_field(), "no peer reference, ignoring");
            return RouteOutcome::NoPeerReference;
        };
        let peer_role = sender.opposite();

        let Some(peer) = self.registry.lookup(peer_role, &peer_id) else {
            debug!(%peer_role, peer_id = %peer_id, "peer not connected, dropping scan");
            counter!(SCANS_DROPPED_TOTAL, "reason" => "offline").increment(1);
            return RouteOutcome::PeerOffline { peer_id };
        };

        if peer.send(Arc::clone(&self.notification)) {
            debug!(%peer_role, peer_id = %peer_id, conn_id = %peer.id, "scan delivered");
            counter!(SCANS_ROUTED_TOTAL).increment(1);
            RouteOutcome::Delivered { peer_id }
        } else {
            warn!(
                %peer_role,
                peer_id = %peer_id,
                conn_id = %peer.id,
                closed = peer.is_closed(),
                "failed to deliver scan notification"
            );
            counter!(SCANS_DROPPED_TOTAL, "reason" => "send_failed").increment(1);
            RouteOutcome::DeliveryFailed { peer_id }
        }
    }
}
