//! Interval sets over a single address family.
//!
//! An [`IpSet`] is an immutable, canonical list of inclusive address ranges:
//! sorted by start, with no two ranges overlapping or touching. Sets are
//! produced by [`IpSetBuilder`], which accepts prefixes, ranges, single
//! addresses and removals in any order and normalizes them on `build`.

mod addr;
mod builder;

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

pub use addr::Address;
pub use builder::IpSetBuilder;

/// Inclusive address range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRange<A> {
    pub start: A,
    pub end: A,
}

impl<A: Address> IpRange<A> {
    pub fn new(start: A, end: A) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one address
    pub fn single(addr: A) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Range covered by a prefix
    pub fn from_net(net: &A::Net) -> Self {
        let (start, end) = A::net_bounds(net);
        Self { start, end }
    }

    /// `start <= end`
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, addr: A) -> bool {
        self.start <= addr && addr <= self.end
    }

    /// Whether `next`, which must not start before `self`, overlaps or
    /// directly follows this range.
    pub(crate) fn touches(&self, next: &Self) -> bool {
        match self.end.successor() {
            Some(after) => next.start <= after,
            None => true,
        }
    }

    /// Minimal prefixes covering this range
    pub fn prefixes(&self) -> Vec<A::Net> {
        A::subnets(self.start, self.end)
    }
}

impl<A: Address> fmt::Display for IpRange<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Canonical interval set for one address family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpSet<A> {
    ranges: Vec<IpRange<A>>,
}

pub type Ipv4Set = IpSet<Ipv4Addr>;
pub type Ipv6Set = IpSet<Ipv6Addr>;

impl<A: Address> Default for IpSet<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A: Address> IpSet<A> {
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Compile a list of prefixes.
    ///
    /// Prefixes are always well-formed ranges, so this cannot fail.
    pub fn from_prefixes<I>(nets: I) -> Self
    where
        I: IntoIterator<Item = A::Net>,
    {
        let ranges = nets.into_iter().map(|n| IpRange::from_net(&n)).collect();
        Self {
            ranges: normalize(ranges),
        }
    }

    /// Wrap ranges that are already known to be canonical.
    pub(crate) fn from_canonical(ranges: Vec<IpRange<A>>) -> Self {
        debug_assert!(is_canonical(&ranges));
        Self { ranges }
    }

    /// Membership test, O(log n) over the range count.
    pub fn contains(&self, addr: A) -> bool {
        let idx = self.ranges.partition_point(|r| r.start <= addr);
        idx > 0 && self.ranges[idx - 1].end >= addr
    }

    pub fn ranges(&self) -> &[IpRange<A>] {
        &self.ranges
    }

    /// Number of disjoint ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Minimal prefix decomposition of the whole set
    pub fn prefixes(&self) -> Vec<A::Net> {
        self.ranges.iter().flat_map(|r| r.prefixes()).collect()
    }

    /// New set with `addr` added
    pub fn union(&self, addr: A) -> Self {
        let mut ranges = self.ranges.clone();
        ranges.push(IpRange::single(addr));
        Self {
            ranges: normalize(ranges),
        }
    }

    /// New set with `addr` removed, splitting the range that holds it
    pub fn subtract(&self, addr: A) -> Self {
        Self {
            ranges: subtract(self.ranges.clone(), &[IpRange::single(addr)]),
        }
    }

    /// Sorted, disjoint and non-adjacent
    pub fn is_canonical(&self) -> bool {
        is_canonical(&self.ranges)
    }
}

impl<A: Address> fmt::Display for IpSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", r)?;
        }
        f.write_str("}")
    }
}

/// Sort by start and merge every pair that overlaps or is contiguous.
pub(crate) fn normalize<A: Address>(mut ranges: Vec<IpRange<A>>) -> Vec<IpRange<A>> {
    ranges.sort_unstable_by_key(|r| r.start);

    let mut out: Vec<IpRange<A>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if let Some(last) = out.last_mut() {
            if last.touches(&r) {
                if r.end > last.end {
                    last.end = r.end;
                }
                continue;
            }
        }
        out.push(r);
    }
    out
}

/// Remove `removals` from `ranges`. Both inputs must be canonical.
pub(crate) fn subtract<A: Address>(
    ranges: Vec<IpRange<A>>,
    removals: &[IpRange<A>],
) -> Vec<IpRange<A>> {
    if removals.is_empty() {
        return ranges;
    }

    let mut out = Vec::with_capacity(ranges.len() + removals.len());
    let mut j = 0;
    for r in ranges {
        let mut cur = Some(r);
        while let Some(c) = cur {
            while j < removals.len() && removals[j].end < c.start {
                j += 1;
            }
            let Some(rm) = removals.get(j).filter(|rm| rm.start <= c.end) else {
                out.push(c);
                break;
            };

            // Head survives below the removal.
            if rm.start > c.start {
                if let Some(end) = rm.start.predecessor() {
                    out.push(IpRange::new(c.start, end));
                }
            }
            // Tail survives above it; keep scanning with the tail.
            cur = if rm.end < c.end {
                rm.end.successor().map(|start| IpRange::new(start, c.end))
            } else {
                None
            };
        }
    }
    out
}

fn is_canonical<A: Address>(ranges: &[IpRange<A>]) -> bool {
    ranges.iter().all(IpRange::is_valid) && ranges.windows(2).all(|w| !w[0].touches(&w[1]))
}
