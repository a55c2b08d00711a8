//! # relay-auth
//!
//! Validation of the signed access token a client presents when it opens a
//! relay connection.
//!
//! Tokens are HS256 JWTs minted by an upstream service. The claim set must
//! carry `id`, `role` (`CUSTOMER` | `RESTAURANT`) and `timestamp` (issue
//! time, epoch seconds). A token is fresh while its `timestamp` is no older
//! than the configured window (60 seconds by default). `exp` is not
//! consulted.

#![deny(unsafe_code)]

pub mod claims;
pub mod errors;
pub mod secret;
pub mod validator;

pub use claims::CredentialClaim;
pub use errors::AuthError;
pub use secret::SigningSecret;
pub use validator::{CredentialValidator, DEFAULT_MAX_AGE};
