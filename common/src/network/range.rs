//! # Range Specifications
//!
//! Turns the range strings found in the configuration into concrete, ordered
//! IPv4 addresses.
//!
//! Two notations are understood, selected by the presence of a `/`:
//! * **CIDR**: `192.168.1.0/24`. Network and broadcast addresses are skipped
//!   when the block holds more than two addresses.
//! * **Dashed octets**: `10.0.0-2.5`. Every octet is either a literal or an
//!   inclusive `lo-hi` span; the result is the full Cartesian product.

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;
use thiserror::Error;

/// Why a range string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeFormatReason {
    /// Dashed-octet form without exactly four fields.
    FieldCount(usize),
    /// An octet (or one side of an octet span) is not an integer in 0..=255.
    InvalidOctet(String),
    /// An octet span whose lower bound is above its upper bound.
    InvertedBounds { lo: u8, hi: u8 },
    /// The CIDR address or prefix could not be parsed.
    InvalidCidr(String),
}

impl fmt::Display for RangeFormatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected 4 octets, found {n}"),
            Self::InvalidOctet(octet) => write!(f, "invalid octet '{octet}'"),
            Self::InvertedBounds { lo, hi } => write!(f, "octet span {lo}-{hi} is inverted"),
            Self::InvalidCidr(e) => write!(f, "invalid network: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range format '{spec}': {reason}")]
pub struct RangeFormatError {
    pub spec: String,
    pub reason: RangeFormatReason,
}

impl RangeFormatError {
    fn new(spec: &str, reason: RangeFormatReason) -> Self {
        Self {
            spec: spec.to_string(),
            reason,
        }
    }
}

/// Represents a continuous range of IPv4 addresses, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Ipv4Addr> + Clone + use<> {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> u64 {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        if end < start {
            return 0;
        }
        u64::from(end - start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Addresses a CIDR block contributes to discovery.
///
/// Blocks larger than two addresses lose their network and broadcast
/// addresses; `/31` and `/32` are returned whole.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let network = Ipv4Network::new(ip, prefix)?;
    let start: u32 = u32::from(network.network());
    let end: u32 = u32::from(network.broadcast());

    if u64::from(end - start) + 1 > 2 {
        return Ok(Ipv4Range::new(
            Ipv4Addr::from(start + 1),
            Ipv4Addr::from(end - 1),
        ));
    }
    Ok(Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end)))
}

/// A parsed range string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// `a.b.c.d/n`, already reduced to its usable hosts.
    Cidr { range: Ipv4Range },
    /// `a.b.c-d.e`, one inclusive span per octet.
    Octets { octets: [RangeInclusive<u8>; 4] },
}

impl FromStr for RangeSpec {
    type Err = RangeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('/') {
            parse_cidr(s)
        } else {
            parse_octets(s)
        }
    }
}

impl RangeSpec {
    /// Ordered addresses of this spec, produced lazily.
    pub fn addresses(&self) -> Box<dyn Iterator<Item = Ipv4Addr> + Send> {
        match self {
            RangeSpec::Cidr { range } => Box::new(range.iter()),
            RangeSpec::Octets { octets } => {
                let [a, b, c, d] = octets.clone();
                Box::new(a.flat_map(move |a| {
                    let (c, d) = (c.clone(), d.clone());
                    b.clone().flat_map(move |b| {
                        let d = d.clone();
                        c.clone()
                            .flat_map(move |c| d.clone().map(move |d| Ipv4Addr::new(a, b, c, d)))
                    })
                }))
            }
        }
    }

    /// Number of addresses [`RangeSpec::addresses`] yields.
    pub fn len(&self) -> u64 {
        match self {
            RangeSpec::Cidr { range } => range.len(),
            RangeSpec::Octets { octets } => octets
                .iter()
                .map(|span| u64::from(*span.end()) - u64::from(*span.start()) + 1)
                .product(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses `spec` and collects every address it describes, in order.
pub fn expand(spec: &str) -> Result<Vec<Ipv4Addr>, RangeFormatError> {
    let range: RangeSpec = spec.parse()?;
    Ok(range.addresses().collect())
}

fn parse_cidr(s: &str) -> Result<RangeSpec, RangeFormatError> {
    let invalid = |e: String| RangeFormatError::new(s, RangeFormatReason::InvalidCidr(e));

    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Err(invalid("missing prefix".to_string()));
    };

    let ip: Ipv4Addr = ip_str
        .trim()
        .parse()
        .map_err(|e| invalid(format!("address '{ip_str}': {e}")))?;

    let prefix: u8 = prefix_str
        .trim()
        .parse()
        .map_err(|e| invalid(format!("prefix '{prefix_str}': {e}")))?;

    let range = cidr_range(ip, prefix).map_err(|e| invalid(e.to_string()))?;
    Ok(RangeSpec::Cidr { range })
}

fn parse_octets(s: &str) -> Result<RangeSpec, RangeFormatError> {
    let fields: Vec<&str> = s.split('.').collect();
    let Ok([a, b, c, d]) = <[&str; 4]>::try_from(fields.as_slice()) else {
        return Err(RangeFormatError::new(
            s,
            RangeFormatReason::FieldCount(fields.len()),
        ));
    };

    let octets = [
        parse_octet_span(a).map_err(|r| RangeFormatError::new(s, r))?,
        parse_octet_span(b).map_err(|r| RangeFormatError::new(s, r))?,
        parse_octet_span(c).map_err(|r| RangeFormatError::new(s, r))?,
        parse_octet_span(d).map_err(|r| RangeFormatError::new(s, r))?,
    ];
    Ok(RangeSpec::Octets { octets })
}

/// Parses a single octet field: `7` or `0-10`.
fn parse_octet_span(field: &str) -> Result<RangeInclusive<u8>, RangeFormatReason> {
    let parse = |octet: &str| -> Result<u8, RangeFormatReason> {
        octet
            .trim()
            .parse::<u8>()
            .map_err(|_| RangeFormatReason::InvalidOctet(octet.to_string()))
    };

    match field.split_once('-') {
        Some((lo, hi)) => {
            let (lo, hi) = (parse(lo)?, parse(hi)?);
            if lo > hi {
                return Err(RangeFormatReason::InvertedBounds { lo, hi });
            }
            Ok(lo..=hi)
        }
        None => {
            let octet = parse(field)?;
            Ok(octet..=octet)
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
