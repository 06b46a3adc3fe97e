//! GeoIP Engine - IP-range membership for routing rules
//!
//! This library answers "does this address belong to group X?" for a
//! routing core:
//! - Compiles CIDR lists into minimal, sorted interval sets per family
//! - Matches IPv4 and IPv6 addresses in O(log n)
//! - Inverse (negated) groups
//! - Runtime add/remove of single addresses without blocking lookups
//! - Shared matchers for groups referenced by many rules
//!
//! # Example
//!
//! ```rust
//! use geoip_engine_r::{GeoIp, GeoIpMatcherContainer};
//!
//! let container = GeoIpMatcherContainer::new();
//!
//! let cn = GeoIp::new("cn", vec!["1.0.1.0/24".parse().unwrap()]);
//! let matcher = container.add(&cn).unwrap();
//! assert!(matcher.matches_ip("1.0.1.7".parse().unwrap()));
//!
//! // Same group again: same matcher
//! let again = container.add(&cn).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&matcher, &again));
//!
//! // Admin updates are visible to every rule sharing the matcher
//! let outcome = matcher.add(&["203.0.113.9", "not-an-ip"]).unwrap();
//! assert_eq!(outcome.skipped, 1);
//! assert!(again.matches_ip("203.0.113.9".parse().unwrap()));
//! ```
//!
//! # Configuration
//!
//! Groups can be loaded from JSON, with prefixes given either as raw
//! geo-database records or as text:
//!
//! ```text
//! { "geoip": [
//!     { "country_code": "CN", "cidr": [{ "ip": [1, 0, 1, 0], "prefix": 24 }] },
//!     { "country_code": "PRIVATE", "reverse_match": true, "cidr": ["10.0.0.0/8"] }
//! ] }
//! ```

pub mod config;
pub mod error;
pub mod ipset;
pub mod matcher;
pub mod snapshot;
pub mod types;

// Re-export commonly used items
pub use config::{GeoIp, GeoIpConfig};
pub use error::{GeoIpError, Result};
pub use ipset::{Address, IpRange, IpSet, IpSetBuilder, Ipv4Set, Ipv6Set};
pub use matcher::{
    BatchOutcome, FamilyUpdate, GeoIpMatcher, GeoIpMatcherContainer, HostMatcher, MatcherKey,
};
pub use snapshot::SnapshotCell;
pub use types::{Cidr, HostInfo, IpFamily};

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_full_workflow() {
        let text = r#"{
            "geoip": [
                { "country_code": "private", "cidr": ["192.168.0.0/16", "10.0.0.0/8", "fd00::/8"] },
                { "country_code": "private", "reverse_match": true, "cidr": ["192.168.0.0/16"] },
                { "cidr": ["203.0.113.0/24"] }
            ]
        }"#;

        // Parse config
        let config = GeoIpConfig::from_json_str(text).unwrap();
        assert_eq!(config.geoip.len(), 3);

        // Register groups
        let container = GeoIpMatcherContainer::new();
        let matchers = container.load_config(&config).unwrap();
        assert_eq!(container.len(), 2);

        let private = &matchers[0];
        let not_private = &matchers[1];
        let custom = &matchers[2];

        // Private address -> in group, not in the inverse group
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(private.matches_ip(ip));
        assert!(!not_private.matches_ip(ip));

        // Public address -> only the inverse group
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(!private.matches_ip(ip));
        assert!(not_private.matches_ip(ip));

        // IPv6 goes to the IPv6 set
        assert!(private.matches(&HostInfo::from_ip("fd00::1".parse().unwrap())));

        // Admin surface blocks one address in the custom list
        let outcome = custom.remove(&["203.0.113.5"]).unwrap();
        assert!(outcome.changed());
        assert!(!custom.matches_ip("203.0.113.5".parse().unwrap()));
        assert!(custom.matches_ip("203.0.113.6".parse().unwrap()));
    }
}
