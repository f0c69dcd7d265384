//! Client address normalisation.
//!
//! The address a request arrives with is partly client-controlled: a proxy
//! appends to `X-Forwarded-For`, but the originating client can pre-seed it.
//! Only trust the result when the deployment puts a proxy in front that
//! overwrites the header.

use std::net::{IpAddr, Ipv4Addr};

/// Normalise a raw client address.
///
/// - keeps only the left-most token of a comma-delimited forwarding chain
/// - maps the IPv6 loopback `::1` to `127.0.0.1`
/// - strips IPv4-mapped IPv6 prefixes (`::ffff:a.b.c.d` -> `a.b.c.d`)
///
/// Anything that does not parse as an IP address is returned trimmed but
/// otherwise untouched.
///
/// # Example
///
/// ```
/// use geo_presence::network::normalize_client_address;
///
/// assert_eq!(normalize_client_address("::1"), "127.0.0.1");
/// assert_eq!(normalize_client_address("::ffff:10.0.0.7"), "10.0.0.7");
/// assert_eq!(normalize_client_address("203.0.113.9, 10.0.0.1"), "203.0.113.9");
/// assert_eq!(normalize_client_address("2001:db8::1"), "2001:db8::1");
/// ```
pub fn normalize_client_address(raw: &str) -> String {
    let first = raw.split(',').next().unwrap_or_default().trim();

    match first.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) if v6.is_loopback() => Ipv4Addr::LOCALHOST.to_string(),
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Err(_) => first.to_string(),
    }
}
