use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{GeoIpError, Result};

/// Address family of an IP address or prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Family of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    /// Determine the family from a raw address length in bytes
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            4 => Some(IpFamily::V4),
            16 => Some(IpFamily::V6),
            _ => None,
        }
    }

    /// Maximum prefix length for this family
    pub fn max_prefix_len(self) -> u8 {
        match self {
            IpFamily::V4 => 32,
            IpFamily::V6 => 128,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Address prefix as delivered by geo databases: raw address bytes plus a
/// prefix length.
///
/// Deserializes from either `{"ip": [..], "prefix": n}` or a textual
/// `"addr/len"` (a bare address means a host prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CidrRepr")]
pub struct Cidr {
    /// Address bytes, 4 for IPv4 and 16 for IPv6
    pub ip: Vec<u8>,
    /// Prefix length in bits
    pub prefix: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CidrRepr {
    Raw { ip: Vec<u8>, prefix: u32 },
    Text(String),
}

impl TryFrom<CidrRepr> for Cidr {
    type Error = GeoIpError;

    fn try_from(repr: CidrRepr) -> Result<Self> {
        match repr {
            CidrRepr::Raw { ip, prefix } => Ok(Cidr { ip, prefix }),
            CidrRepr::Text(text) => text.parse(),
        }
    }
}

impl Cidr {
    pub fn new(ip: impl Into<Vec<u8>>, prefix: u32) -> Self {
        Self {
            ip: ip.into(),
            prefix,
        }
    }

    /// Address family, if the byte length identifies one
    pub fn family(&self) -> Option<IpFamily> {
        IpFamily::from_len(self.ip.len())
    }

    /// Convert to a typed network.
    ///
    /// Host bits below the prefix are kept; set compilation masks them.
    pub fn to_ipnet(&self) -> Result<IpNet> {
        let addr = match self.ip.len() {
            4 => IpAddr::V4(Ipv4Addr::new(
                self.ip[0], self.ip[1], self.ip[2], self.ip[3],
            )),
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&self.ip);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            n => {
                return Err(GeoIpError::InvalidPrefix(format!(
                    "unknown address family for {}-byte address {:?}",
                    n, self.ip
                )))
            }
        };

        let prefix = u8::try_from(self.prefix)
            .map_err(|_| GeoIpError::InvalidPrefix(format!("{}/{}", addr, self.prefix)))?;
        IpNet::new(addr, prefix)
            .map_err(|_| GeoIpError::InvalidPrefix(format!("{}/{}", addr, self.prefix)))
    }
}

impl From<IpNet> for Cidr {
    fn from(net: IpNet) -> Self {
        let ip = match net.addr() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Self {
            ip,
            prefix: u32::from(net.prefix_len()),
        }
    }
}

impl FromStr for Cidr {
    type Err = GeoIpError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains('/') {
            let net: IpNet = s
                .parse()
                .map_err(|_| GeoIpError::InvalidPrefix(s.to_string()))?;
            return Ok(net.into());
        }
        let ip: IpAddr = s
            .parse()
            .map_err(|_| GeoIpError::InvalidPrefix(s.to_string()))?;
        Ok(IpNet::from(ip).into())
    }
}

/// Parse a textual address as accepted by admin batches.
///
/// IPv4-mapped IPv6 addresses are folded into IPv4.
pub fn parse_ip(s: &str) -> Result<IpAddr> {
    s.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| GeoIpError::InvalidAddress(s.to_string()))
}

/// Host information for matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    /// Resolved IPv4 address
    pub ipv4: Option<Ipv4Addr>,
    /// Resolved IPv6 address
    pub ipv6: Option<Ipv6Addr>,
}

impl HostInfo {
    /// Create a new HostInfo from its resolved addresses
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Create a HostInfo from an IP address
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::new(Some(v4), None),
            IpAddr::V6(v6) => Self::new(None, Some(v6)),
        }
    }
}
