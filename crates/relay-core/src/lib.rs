//! # relay-core
//!
//! Types shared by every relay crate.
//!
//! - [`Role`]: the two classes of client (`CUSTOMER` / `RESTAURANT`)
//! - [`ScanEvent`]: an inbound message naming the peer to notify
//! - [`Notification`]: the fixed `{"scanned": true}` payload
//! - [`ProtocolError`]: why an inbound frame could not be understood

#![deny(unsafe_code)]

pub mod errors;
pub mod messages;
pub mod role;

pub use errors::ProtocolError;
pub use messages::{Notification, ScanEvent};
pub use role::{Role, UnknownRole};
