//! Session registry: who is connected right now, per role.

use std::sync::Arc;

use dashmap::DashMap;
use relay_core::Role;

use crate::websocket::connection::{ConnectionId, PeerConnection};

/// Two concurrent tables, `customer id → connection` and
/// `restaurant id → connection`.
///
/// Each operation is atomic on its own; there are no multi-step
/// transactions. A later `register` for the same `(role, id)` replaces the
/// earlier entry without closing the earlier connection.
#[derive(Default)]
pub struct SessionRegistry {
    customers: DashMap<String, Arc<PeerConnection>>,
    restaurants: DashMap<String, Arc<PeerConnection>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, role: Role) -> &DashMap<String, Arc<PeerConnection>> {
        match role {
            Role::Customer => &self.customers,
            Role::Restaurant => &self.restaurants,
        }
    }

    /// Insert or overwrite the entry for `(role, id)`.
    ///
    /// Returns the connection that was displaced, if any.
    pub fn register(
        &self,
        role: Role,
        id: impl Into<String>,
        connection: Arc<PeerConnection>,
    ) -> Option<Arc<PeerConnection>> {
        self.table(role).insert(id.into(), connection)
    }

    /// Remove the entry for `(role, id)` whatever connection it points at.
    /// No-op if absent.
    pub fn unregister(&self, role: Role, id: &str) -> Option<Arc<PeerConnection>> {
        self.table(role).remove(id).map(|(_, conn)| conn)
    }

    /// Remove the entry for `(role, id)` only if it is still `conn_id`.
    ///
    /// A connection that was superseded by a newer one with the same id
    /// must not evict the newer registration when it closes.
    pub fn unregister_if_current(&self, role: Role, id: &str, conn_id: &ConnectionId) -> bool {
        self.table(role)
            .remove_if(id, |_, current| current.id == *conn_id)
            .is_some()
    }

    /// Current connection for `(role, id)`.
    pub fn lookup(&self, role: Role, id: &str) -> Option<Arc<PeerConnection>> {
        self.table(role).get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Live entries for one role.
    pub fn count(&self, role: Role) -> usize {
        self.table(role).len()
    }

    /// Live entries across both roles.
    pub fn total(&self) -> usize {
        self.customers.len() + self.restaurants.len()
    }
}
