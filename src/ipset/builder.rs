use super::{normalize, subtract, Address, IpRange, IpSet};
use crate::error::{GeoIpError, Result};

/// Accumulates additions and removals and compiles them into a canonical
/// [`IpSet`].
///
/// Operations apply in call order: an address removed and then added again
/// ends up in the set. Invalid ranges are recorded and reported by
/// [`build`](Self::build) rather than at the call site.
#[derive(Debug, Clone)]
pub struct IpSetBuilder<A> {
    adds: Vec<IpRange<A>>,
    removes: Vec<IpRange<A>>,
    errors: Vec<String>,
}

impl<A: Address> Default for IpSetBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Address> IpSetBuilder<A> {
    pub fn new() -> Self {
        Self {
            adds: Vec::new(),
            removes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Start from the contents of an existing set
    pub fn from_set(set: &IpSet<A>) -> Self {
        Self {
            adds: set.ranges().to_vec(),
            removes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add(&mut self, addr: A) {
        self.add_range(IpRange::single(addr));
    }

    pub fn add_prefix(&mut self, net: &A::Net) {
        self.add_range(IpRange::from_net(net));
    }

    pub fn add_range(&mut self, range: IpRange<A>) {
        if !range.is_valid() {
            self.errors.push(format!("invalid range {}-{}", range.start, range.end));
            return;
        }
        self.flush_removals();
        self.adds.push(range);
    }

    pub fn add_set(&mut self, set: &IpSet<A>) {
        self.flush_removals();
        self.adds.extend_from_slice(set.ranges());
    }

    pub fn remove(&mut self, addr: A) {
        self.remove_range(IpRange::single(addr));
    }

    pub fn remove_prefix(&mut self, net: &A::Net) {
        self.remove_range(IpRange::from_net(net));
    }

    pub fn remove_range(&mut self, range: IpRange<A>) {
        if !range.is_valid() {
            self.errors.push(format!("invalid range {}-{}", range.start, range.end));
            return;
        }
        self.removes.push(range);
    }

    pub fn remove_set(&mut self, set: &IpSet<A>) {
        self.removes.extend_from_slice(set.ranges());
    }

    /// Normalize and produce the set.
    ///
    /// Fails with [`GeoIpError::SetNormalization`] if any invalid range was
    /// supplied; the builder is consumed either way.
    pub fn build(mut self) -> Result<IpSet<A>> {
        if !self.errors.is_empty() {
            return Err(GeoIpError::SetNormalization {
                family: A::FAMILY,
                message: self.errors.join("; "),
            });
        }
        self.flush_removals();
        Ok(IpSet::from_canonical(normalize(self.adds)))
    }

    /// Apply pending removals to everything added so far.
    fn flush_removals(&mut self) {
        if self.removes.is_empty() {
            return;
        }
        let adds = normalize(std::mem::take(&mut self.adds));
        let removes = normalize(std::mem::take(&mut self.removes));
        self.adds = subtract(adds, &removes);
    }
}
