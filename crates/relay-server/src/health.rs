//! `/health` endpoint.

use std::time::Instant;

use relay_core::Role;
use serde::Serialize;

use crate::registry::SessionRegistry;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered customer sessions.
    pub customers: usize,
    /// Registered restaurant sessions.
    pub restaurants: usize,
}

/// Build a health response from the live registry.
pub fn health_check(start_time: Instant, registry: &SessionRegistry) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        customers: registry.count(Role::Customer),
        restaurants: registry.count(Role::Restaurant),
    }
}
