//! Token claim sets.

use chrono::{DateTime, Utc};
use relay_core::Role;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AuthError;

/// A verified, fresh credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialClaim {
    /// Client identity within its role.
    pub id: String,
    /// Which registry table the client joins.
    pub role: Role,
    /// When the issuer minted the token.
    pub issued_at: DateTime<Utc>,
}

/// Claim set as it appears on the wire. Every field is optional here so
/// that absence can be reported per field rather than as a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawClaims {
    pub id: Option<Value>,
    pub role: Option<String>,
    pub timestamp: Option<f64>,
}

impl RawClaims {
    /// Check presence and types. Role spelling and freshness are checked
    /// by the validator, freshness first.
    pub(crate) fn into_parts(self) -> Result<(String, String, f64), AuthError> {
        let id = match self.id {
            None => return Err(AuthError::MissingField("id")),
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            Some(other) => {
                return Err(AuthError::MalformedClaims(format!(
                    "id must be a string or integer, got {other}"
                )));
            }
        };
        let role = self.role.ok_or(AuthError::MissingField("role"))?;
        let timestamp = self.timestamp.ok_or(AuthError::MissingField("timestamp"))?;
        Ok((id, role, timestamp))
    }
}

/// Map the `role` claim onto a [`Role`].
pub(crate) fn parse_role(role: &str) -> Result<Role, AuthError> {
    role.parse::<Role>().map_err(|e| AuthError::MissingRole(e.0))
}
