//! WebSocket gateway: handshake credentials, per-connection handles and the
//! session supervisor.

pub mod connection;
pub mod handshake;
pub mod session;
