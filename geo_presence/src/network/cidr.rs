//! IPv4 CIDR ranges.

use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 range in `base/prefix` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    base: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Create a range; `None` when the prefix is longer than 32.
    pub fn new(base: Ipv4Addr, prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { base, prefix })
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Network mask for the prefix; `/0` yields an all-zero mask.
    pub fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = self.mask();
        (u32::from(addr) & mask) == (u32::from(self.base) & mask)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length in {s:?}"))?;

        let base: Ipv4Addr = base
            .trim()
            .parse()
            .map_err(|_| format!("invalid IPv4 base in {s:?}"))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| format!("invalid prefix length in {s:?}"))?;

        Ipv4Cidr::new(base, prefix).ok_or_else(|| format!("prefix length out of range in {s:?}"))
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}
