use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use ipnet::IpNet;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::HostMatcher;
use crate::error::{GeoIpError, Result};
use crate::ipset::{Address, IpSet, IpSetBuilder, Ipv4Set, Ipv6Set};
use crate::snapshot::SnapshotCell;
use crate::types::{parse_ip, Cidr, HostInfo};

/// Per-family result of an admin batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyUpdate {
    /// Addresses of this family that were applied to the set
    pub applied: usize,
    /// Whether the stored set actually differs afterwards
    pub changed: bool,
}

/// Result of [`GeoIpMatcher::add`] / [`GeoIpMatcher::remove`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub ipv4: FamilyUpdate,
    pub ipv6: FamilyUpdate,
    /// Entries that did not parse as an IP address
    pub skipped: usize,
}

impl BatchOutcome {
    /// Total addresses applied across both families
    pub fn applied(&self) -> usize {
        self.ipv4.applied + self.ipv6.applied
    }

    /// Whether either family's set changed
    pub fn changed(&self) -> bool {
        self.ipv4.changed || self.ipv6.changed
    }
}

/// GeoIP matcher - matches IP addresses against a named group of ranges
///
/// Each family is held in its own copy-on-write snapshot, so lookups never
/// see a half-applied [`add`](Self::add) or [`remove`](Self::remove).
#[derive(Debug)]
pub struct GeoIpMatcher {
    country_code: String,
    inverse: bool,
    ipv4: SnapshotCell<Ipv4Set>,
    ipv6: SnapshotCell<Ipv6Set>,
    // Serializes read-modify-write batches; lookups never take it.
    update_lock: Mutex<()>,
}

impl GeoIpMatcher {
    /// Compile a matcher from raw geo-database prefixes.
    ///
    /// The first malformed prefix aborts construction.
    pub fn new(country_code: &str, inverse: bool, cidrs: &[Cidr]) -> Result<Self> {
        let mut v4 = IpSetBuilder::<Ipv4Addr>::new();
        let mut v6 = IpSetBuilder::<Ipv6Addr>::new();
        for cidr in cidrs {
            match cidr.to_ipnet()? {
                IpNet::V4(net) => v4.add_prefix(&net),
                IpNet::V6(net) => v6.add_prefix(&net),
            }
        }

        let matcher = Self::from_sets(country_code, inverse, v4.build()?, v6.build()?);
        debug!(
            country_code = %matcher.country_code,
            inverse,
            prefixes = cidrs.len(),
            ipv4_ranges = matcher.ipv4.load().len(),
            ipv6_ranges = matcher.ipv6.load().len(),
            "compiled geoip matcher"
        );
        Ok(matcher)
    }

    /// Create a new GeoIP matcher from already parsed networks
    pub fn from_nets(country_code: &str, nets: Vec<IpNet>) -> Self {
        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        for net in nets {
            match net {
                IpNet::V4(n) => v4.push(n),
                IpNet::V6(n) => v6.push(n),
            }
        }
        Self::from_sets(
            country_code,
            false,
            IpSet::from_prefixes(v4),
            IpSet::from_prefixes(v6),
        )
    }

    fn from_sets(country_code: &str, inverse: bool, ipv4: Ipv4Set, ipv6: Ipv6Set) -> Self {
        Self {
            country_code: country_code.to_string(),
            inverse,
            ipv4: SnapshotCell::new(ipv4),
            ipv6: SnapshotCell::new(ipv6),
            update_lock: Mutex::new(()),
        }
    }

    /// Group label as given; empty for anonymous groups
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Set inverse matching (match if NOT in the group).
    ///
    /// Takes `&mut self`: once a matcher is shared its polarity is fixed.
    pub fn set_inverse(&mut self, inverse: bool) {
        self.inverse = inverse;
    }

    /// Current IPv4 snapshot
    pub fn ipv4_set(&self) -> Arc<Ipv4Set> {
        self.ipv4.load()
    }

    /// Current IPv6 snapshot
    pub fn ipv6_set(&self) -> Arc<Ipv6Set> {
        self.ipv6.load()
    }

    /// Membership in the stored ranges, ignoring the inverse flag
    pub fn contains_raw(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.ipv4.load().contains(v4),
            IpAddr::V6(v6) => self.ipv6.load().contains(v6),
        }
    }

    /// Check whether `ip` belongs to the group, honoring the inverse flag
    pub fn matches_ip(&self, ip: IpAddr) -> bool {
        let matched = self.contains_raw(ip);
        if self.inverse { !matched } else { matched }
    }

    /// Match a raw address. Lengths other than 4 or 16 bytes match nothing.
    pub fn matches_bytes(&self, ip: &[u8]) -> bool {
        if let Ok(octets) = <[u8; 4]>::try_from(ip) {
            self.matches_ip(IpAddr::V4(Ipv4Addr::from(octets)))
        } else if let Ok(octets) = <[u8; 16]>::try_from(ip) {
            self.matches_ip(IpAddr::V6(Ipv6Addr::from(octets)))
        } else {
            false
        }
    }

    /// Add single addresses to the group.
    ///
    /// Unparsable entries are skipped and counted; duplicates count once.
    /// Each family is rebuilt and swapped in on its own: if the IPv6 rebuild
    /// fails after IPv4 was applied, the error is
    /// [`GeoIpError::PartialUpdate`] carrying the IPv4 result.
    pub fn add<S: AsRef<str>>(&self, ips: &[S]) -> Result<BatchOutcome> {
        let (v4, v6, skipped) = self.partition(ips);

        let _guard = self.update_lock.lock();
        self.apply(
            skipped,
            v4.len(),
            |b| v4.iter().for_each(|&ip| b.add(ip)),
            v6.len(),
            |b| v6.iter().for_each(|&ip| b.add(ip)),
        )
    }

    /// Remove single addresses from the group.
    ///
    /// Only addresses currently inside the stored ranges count, regardless of
    /// the inverse flag. A family with nothing to remove is left untouched.
    /// Failures are reported the same way as for [`add`](Self::add).
    pub fn remove<S: AsRef<str>>(&self, ips: &[S]) -> Result<BatchOutcome> {
        let (v4, v6, skipped) = self.partition(ips);

        let _guard = self.update_lock.lock();
        let v4 = members(&self.ipv4, v4);
        let v6 = members(&self.ipv6, v6);
        self.apply(
            skipped,
            v4.len(),
            |b| v4.iter().for_each(|&ip| b.remove(ip)),
            v6.len(),
            |b| v6.iter().for_each(|&ip| b.remove(ip)),
        )
    }

    /// Run one batch: IPv4 first, then IPv6. A family with nothing to apply
    /// is skipped. Caller must hold `update_lock`.
    fn apply<F4, F6>(
        &self,
        skipped: usize,
        v4_count: usize,
        v4_edit: F4,
        v6_count: usize,
        v6_edit: F6,
    ) -> Result<BatchOutcome>
    where
        F4: FnOnce(&mut IpSetBuilder<Ipv4Addr>),
        F6: FnOnce(&mut IpSetBuilder<Ipv6Addr>),
    {
        let mut outcome = BatchOutcome {
            skipped,
            ..Default::default()
        };
        if v4_count > 0 {
            outcome.ipv4 = self.update(&self.ipv4, v4_count, v4_edit)?;
        }
        if v6_count > 0 {
            outcome.ipv6 = match self.update(&self.ipv6, v6_count, v6_edit) {
                Ok(update) => update,
                Err(e) if outcome.ipv4.applied > 0 => {
                    return Err(GeoIpError::PartialUpdate {
                        outcome,
                        source: Box::new(e),
                    })
                }
                Err(e) => return Err(e),
            };
        }
        Ok(outcome)
    }

    /// Split a text batch into distinct addresses per family, counting
    /// entries that fail to parse.
    fn partition<S: AsRef<str>>(&self, ips: &[S]) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>, usize) {
        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        let mut skipped = 0;
        for raw in ips {
            match parse_ip(raw.as_ref()) {
                Ok(IpAddr::V4(ip)) => v4.push(ip),
                Ok(IpAddr::V6(ip)) => v6.push(ip),
                Err(e) => {
                    debug!(country_code = %self.country_code, error = %e, "skipping entry");
                    skipped += 1;
                }
            }
        }
        v4.sort_unstable();
        v4.dedup();
        v6.sort_unstable();
        v6.dedup();
        (v4, v6, skipped)
    }

    /// Rebuild one family from its current snapshot and swap it in.
    /// Caller must hold `update_lock`.
    fn update<A, F>(
        &self,
        cell: &SnapshotCell<IpSet<A>>,
        applied: usize,
        edit: F,
    ) -> Result<FamilyUpdate>
    where
        A: Address,
        F: FnOnce(&mut IpSetBuilder<A>),
    {
        let family = A::FAMILY;
        let current = cell.load();
        let mut builder = IpSetBuilder::from_set(&current);
        edit(&mut builder);

        let next = builder.build().map_err(|e| {
            warn!(
                country_code = %self.country_code,
                family = %family,
                error = %e,
                "set update failed"
            );
            e
        })?;

        let changed = next != *current;
        if changed {
            info!(
                country_code = %self.country_code,
                family = %family,
                applied,
                ranges = next.len(),
                "updated geoip set"
            );
            cell.store(Arc::new(next));
        }
        Ok(FamilyUpdate { applied, changed })
    }
}

/// Keep only addresses currently inside the family's stored ranges.
fn members<A: Address>(cell: &SnapshotCell<IpSet<A>>, ips: Vec<A>) -> Vec<A> {
    let set = cell.load();
    ips.into_iter().filter(|&ip| set.contains(ip)).collect()
}

impl HostMatcher for GeoIpMatcher {
    fn matches(&self, host: &HostInfo) -> bool {
        // Inverse applies to the combined result: a dual-stack host with
        // either address in the group is not "outside" it.
        let v4 = host.ipv4.is_some_and(|ip| self.ipv4.load().contains(ip));
        let v6 = host.ipv6.is_some_and(|ip| self.ipv6.load().contains(ip));
        let any_match = v4 || v6;
        if self.inverse { !any_match } else { any_match }
    }
}
