use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::GeoIpMatcher;
use crate::config::{GeoIp, GeoIpConfig};
use crate::error::Result;

/// Registry key: a named group and its polarity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatcherKey {
    pub country_code: String,
    pub inverse: bool,
}

impl MatcherKey {
    pub fn new(country_code: &str, inverse: bool) -> Self {
        Self {
            country_code: country_code.to_string(),
            inverse,
        }
    }
}

/// Keeps one shared [`GeoIpMatcher`] per (country code, inverse) pair.
///
/// Routing rules that reference the same group get the same `Arc`. Codes are
/// compared exactly as given, so `cn` and `CN` are different groups. The
/// first registration of a key wins; prefixes passed for an already known
/// key are ignored. Groups with an empty country code are anonymous: each
/// request compiles a private matcher that is never stored.
///
/// The container is an ordinary value owned by whatever sets up routing, so
/// dropping it (or calling [`clear`](Self::clear)) releases the cache.
#[derive(Debug, Default)]
pub struct GeoIpMatcherContainer {
    matchers: Mutex<HashMap<MatcherKey, Arc<GeoIpMatcher>>>,
}

impl GeoIpMatcherContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared matcher for `geoip`, compiling it on first use.
    pub fn add(&self, geoip: &GeoIp) -> Result<Arc<GeoIpMatcher>> {
        if geoip.country_code.is_empty() {
            let matcher = GeoIpMatcher::new("", geoip.reverse_match, &geoip.cidr)?;
            return Ok(Arc::new(matcher));
        }

        let key = MatcherKey::new(&geoip.country_code, geoip.reverse_match);
        // Lookup, compile and insert happen under one lock, so the first
        // caller for a key decides its contents.
        let mut matchers = self.matchers.lock();
        if let Some(existing) = matchers.get(&key) {
            debug!(
                country_code = %key.country_code,
                inverse = key.inverse,
                "reusing geoip matcher"
            );
            return Ok(existing.clone());
        }

        let matcher = Arc::new(GeoIpMatcher::new(
            &key.country_code,
            key.inverse,
            &geoip.cidr,
        )?);
        matchers.insert(key, matcher.clone());
        Ok(matcher)
    }

    /// Register every group of a config, returning matchers in input order.
    pub fn load_config(&self, config: &GeoIpConfig) -> Result<Vec<Arc<GeoIpMatcher>>> {
        config.geoip.iter().map(|geoip| self.add(geoip)).collect()
    }

    /// Look up an already registered matcher
    pub fn get(&self, country_code: &str, inverse: bool) -> Option<Arc<GeoIpMatcher>> {
        self.matchers
            .lock()
            .get(&MatcherKey::new(country_code, inverse))
            .cloned()
    }

    /// Number of registered (named) matchers
    pub fn len(&self) -> usize {
        self.matchers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.lock().is_empty()
    }

    /// Drop every registered matcher. Matchers already handed out stay valid.
    pub fn clear(&self) {
        self.matchers.lock().clear();
    }
}
