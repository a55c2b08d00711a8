//! Client roles.

use std::fmt;
use std::str::FromStr;

/// Which side of the relay a connection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// A diner scanning a restaurant's code.
    Customer,
    /// A restaurant waiting to hear about scans.
    Restaurant,
}

impl Role {
    /// Wire spelling of the role, as carried in the token claim.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Restaurant => "RESTAURANT",
        }
    }

    /// The role a scan from this role is routed to.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Customer => Self::Restaurant,
            Self::Restaurant => Self::Customer,
        }
    }

    /// Message key that names the peer when this role sends a scan.
    pub const fn peer_field(self) -> &'static str {
        match self {
            Self::Customer => "restaurant_id",
            Self::Restaurant => "customer_id",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is neither `CUSTOMER` nor `RESTAURANT`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact, case-sensitive match on the wire spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(Self::Customer),
            "RESTAURANT" => Ok(Self::Restaurant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
