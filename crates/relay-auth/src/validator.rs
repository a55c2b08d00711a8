//! Credential validation.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{CredentialClaim, RawClaims, parse_role};
use crate::errors::AuthError;
use crate::secret::SigningSecret;

/// Default freshness window for the `timestamp` claim.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

/// Verifies tokens against the process-wide signing secret.
///
/// Built once at startup and shared by every connection.
#[derive(Clone)]
pub struct CredentialValidator {
    key: DecodingKey,
    validation: Validation,
    max_age: Duration,
}

impl CredentialValidator {
    /// Validator with the default 60 second freshness window.
    pub fn new(secret: &SigningSecret) -> Self {
        Self::with_max_age(secret, DEFAULT_MAX_AGE)
    }

    /// Validator with a custom freshness window.
    pub fn with_max_age(secret: &SigningSecret, max_age: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Freshness comes from `timestamp`, not `exp`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret.expose()),
            validation,
            max_age,
        }
    }

    /// Configured freshness window.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Verify `raw_token` and extract its claim.
    ///
    /// Checks run in order: presence, signature, claim shape, freshness,
    /// role. The first failure wins.
    pub fn validate(
        &self,
        raw_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CredentialClaim, AuthError> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let data = jsonwebtoken::decode::<RawClaims>(token, &self.key, &self.validation)
            .map_err(map_jwt_error)?;
        let (id, role, timestamp) = data.claims.into_parts()?;
        let issued_at = check_freshness(timestamp, now, self.max_age)?;
        let role = parse_role(&role)?;

        Ok(CredentialClaim {
            id,
            role,
            issued_at,
        })
    }
}

impl fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
        _ => AuthError::MalformedClaims(err.to_string()),
    }
}

/// Accept iff `timestamp >= now - max_age`. Issue times in the future are
/// accepted.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn check_freshness(
    timestamp: f64,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<DateTime<Utc>, AuthError> {
    let issued_at = DateTime::from_timestamp_millis((timestamp * 1000.0) as i64)
        .ok_or_else(|| AuthError::MalformedClaims(format!("timestamp out of range: {timestamp}")))?;

    let now_secs = now.timestamp_millis() as f64 / 1000.0;
    let age = now_secs - timestamp;
    if age > max_age.as_secs_f64() {
        return Err(AuthError::Expired {
            age_secs: age as i64,
            max_age_secs: max_age.as_secs(),
        });
    }
    Ok(issued_at)
}
