//! Network allow-list validation.
//!
//! Client addresses are normalised with [`normalize_client_address`] and then
//! matched against an office's IPv4 CIDR ranges with [`is_allowed`]. Nothing in
//! this module fails: malformed addresses or ranges simply do not match, and an
//! empty allow-list admits nobody.
//!
//! ## Example
//!
//! ```
//! use geo_presence::network::{is_allowed, normalize_client_address};
//!
//! let client = normalize_client_address("::ffff:192.168.1.5, 10.0.0.1");
//! assert_eq!(client, "192.168.1.5");
//! assert!(is_allowed(&client, &["192.168.1.0/24".to_string()]));
//! assert!(!is_allowed(&client, &[]));
//! ```

pub mod address;
pub mod cidr;

pub use address::normalize_client_address;
pub use cidr::Ipv4Cidr;

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Verdict of a secondary factor that may not have been evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorVerdict {
    Pass,
    Fail,
    NotEvaluated,
}

impl std::fmt::Display for FactorVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactorVerdict::Pass => write!(f, "PASS"),
            FactorVerdict::Fail => write!(f, "FAIL"),
            FactorVerdict::NotEvaluated => write!(f, "NOT_EVALUATED"),
        }
    }
}

impl std::str::FromStr for FactorVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(FactorVerdict::Pass),
            "FAIL" => Ok(FactorVerdict::Fail),
            "NOT_EVALUATED" => Ok(FactorVerdict::NotEvaluated),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// Check whether a client address falls inside any of the allowed ranges.
///
/// The address is normalised first, so raw header values are accepted.
/// Only IPv4 literals can match.
pub fn is_allowed(client_address: &str, allowed_ranges: &[String]) -> bool {
    if allowed_ranges.is_empty() {
        return false;
    }

    let normalized = normalize_client_address(client_address);
    let Ok(addr) = normalized.parse::<Ipv4Addr>() else {
        return false;
    };

    allowed_ranges
        .iter()
        .filter_map(|range| range.parse::<Ipv4Cidr>().ok())
        .any(|cidr| cidr.contains(addr))
}
