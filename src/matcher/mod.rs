mod container;
mod geoip;

pub use container::{GeoIpMatcherContainer, MatcherKey};
pub use geoip::{BatchOutcome, FamilyUpdate, GeoIpMatcher};

use crate::types::HostInfo;

/// Trait for host matchers
pub trait HostMatcher: Send + Sync {
    /// Check if the host matches this matcher
    fn matches(&self, host: &HostInfo) -> bool;
}

impl<M: HostMatcher + ?Sized> HostMatcher for std::sync::Arc<M> {
    fn matches(&self, host: &HostInfo) -> bool {
        (**self).matches(host)
    }
}
