//! # relay-server
//!
//! Axum WebSocket relay between customer and restaurant clients.
//!
//! - Handshake: token lookup and validation before the session starts
//! - Session registry: one live connection per `(role, id)`
//! - Scan routing: a scan from one role notifies the referenced peer
//! - HTTP endpoints: health check and Prometheus metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::SessionError;
pub use registry::SessionRegistry;
pub use router::{RouteOutcome, ScanRouter};
pub use server::RelayServer;
