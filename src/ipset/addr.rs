use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv4Subnets, Ipv6Net, Ipv6Subnets};

use crate::types::IpFamily;

/// An address of a single family that interval sets can be built over.
pub trait Address:
    Copy + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Typed prefix of this family
    type Net: Copy + Eq + fmt::Debug + fmt::Display;

    const FAMILY: IpFamily;
    const MIN: Self;
    const MAX: Self;

    /// Next address, `None` at the top of the space
    fn successor(self) -> Option<Self>;

    /// Previous address, `None` at the bottom of the space
    fn predecessor(self) -> Option<Self>;

    /// First and last address covered by a prefix (host bits are ignored)
    fn net_bounds(net: &Self::Net) -> (Self, Self);

    /// Minimal list of prefixes exactly covering `[start, end]`
    fn subnets(start: Self, end: Self) -> Vec<Self::Net>;

    /// Narrow a mixed-family address, `None` for the other family
    fn from_ip(ip: IpAddr) -> Option<Self>;
}

impl Address for Ipv4Addr {
    type Net = Ipv4Net;

    const FAMILY: IpFamily = IpFamily::V4;
    const MIN: Self = Ipv4Addr::UNSPECIFIED;
    const MAX: Self = Ipv4Addr::BROADCAST;

    fn successor(self) -> Option<Self> {
        u32::from(self).checked_add(1).map(Ipv4Addr::from)
    }

    fn predecessor(self) -> Option<Self> {
        u32::from(self).checked_sub(1).map(Ipv4Addr::from)
    }

    fn net_bounds(net: &Ipv4Net) -> (Self, Self) {
        (net.network(), net.broadcast())
    }

    fn subnets(start: Self, end: Self) -> Vec<Ipv4Net> {
        Ipv4Subnets::new(start, end, 0).collect()
    }

    fn from_ip(ip: IpAddr) -> Option<Self> {
        match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }
    }
}

impl Address for Ipv6Addr {
    type Net = Ipv6Net;

    const FAMILY: IpFamily = IpFamily::V6;
    const MIN: Self = Ipv6Addr::UNSPECIFIED;
    const MAX: Self = Ipv6Addr::new(
        0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    );

    fn successor(self) -> Option<Self> {
        u128::from(self).checked_add(1).map(Ipv6Addr::from)
    }

    fn predecessor(self) -> Option<Self> {
        u128::from(self).checked_sub(1).map(Ipv6Addr::from)
    }

    fn net_bounds(net: &Ipv6Net) -> (Self, Self) {
        (net.network(), net.broadcast())
    }

    fn subnets(start: Self, end: Self) -> Vec<Ipv6Net> {
        Ipv6Subnets::new(start, end, 0).collect()
    }

    fn from_ip(ip: IpAddr) -> Option<Self> {
        match ip {
            IpAddr::V6(v6) => Some(v6),
            IpAddr::V4(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_neighbours_saturate_at_edges() {
        assert_eq!(Ipv4Addr::MAX.successor(), None);
        assert_eq!(Ipv4Addr::MIN.predecessor(), None);
        assert_eq!(
            Ipv4Addr::new(10, 0, 0, 255).successor(),
            Some(Ipv4Addr::new(10, 0, 1, 0))
        );
    }

    #[test]
    fn test_v6_neighbours_saturate_at_edges() {
        assert_eq!(Ipv6Addr::MAX.successor(), None);
        assert_eq!(Ipv6Addr::MIN.predecessor(), None);
        let ip: Ipv6Addr = "2001:db8::ffff".parse().unwrap();
        assert_eq!(ip.successor(), Some("2001:db8::1:0".parse().unwrap()));
    }

    #[test]
    fn test_net_bounds_masks_host_bits() {
        let net: Ipv4Net = "203.0.113.77/24".parse().unwrap();
        assert_eq!(
            Ipv4Addr::net_bounds(&net),
            (Ipv4Addr::new(203, 0, 113, 0), Ipv4Addr::new(203, 0, 113, 255))
        );
    }

    #[test]
    fn test_subnets_of_unaligned_range() {
        let nets = Ipv4Addr::subnets(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 6));
        let text: Vec<String> = nets.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            text,
            vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
        );
    }
}
