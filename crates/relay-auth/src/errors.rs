//! Auth error types.

/// Why a connection's credential was rejected.
///
/// Every variant ends the connection; callers do not distinguish between
/// them beyond logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No token in the handshake.
    #[error("missing access token")]
    MissingToken,

    /// Signature did not verify against the signing secret, or the token
    /// names an algorithm other than HS256.
    #[error("bad token signature")]
    BadSignature,

    /// Token is not a well-formed JWT, or a claim has the wrong type.
    #[error("malformed token claims: {0}")]
    MalformedClaims(String),

    /// The `timestamp` claim is older than the freshness window.
    #[error("token expired (issued {age_secs}s ago, limit {max_age_secs}s)")]
    Expired {
        /// Seconds between issue time and validation time.
        age_secs: i64,
        /// The configured window.
        max_age_secs: u64,
    },

    /// A required claim is absent or null.
    #[error("missing claim: {0}")]
    MissingField(&'static str),

    /// The `role` claim is not `CUSTOMER` or `RESTAURANT`.
    #[error("missing role (got {0:?})")]
    MissingRole(String),
}

impl AuthError {
    /// Short stable label for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::BadSignature => "bad_signature",
            Self::MalformedClaims(_) => "malformed_claims",
            Self::Expired { .. } => "expired",
            Self::MissingField(_) => "missing_field",
            Self::MissingRole(_) => "missing_role",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_display() {
        let err = AuthError::Expired {
            age_secs: 75,
            max_age_secs: 60,
        };
        assert_eq!(err.to_string(), "token expired (issued 75s ago, limit 60s)");
    }

    #[test]
    fn missing_role_display() {
        let err = AuthError::MissingRole("ADMIN".into());
        assert_eq!(err.to_string(), "missing role (got \"ADMIN\")");
    }

    #[test]
    fn kinds_are_distinct() {
        let errs = [
            AuthError::MissingToken,
            AuthError::BadSignature,
            AuthError::MalformedClaims(String::new()),
            AuthError::Expired {
                age_secs: 0,
                max_age_secs: 0,
            },
            AuthError::MissingField("id"),
            AuthError::MissingRole(String::new()),
        ];
        let mut kinds: Vec<_> = errs.iter().map(AuthError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errs.len());
    }
}
