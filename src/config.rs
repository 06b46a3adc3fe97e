//! Group configuration.
//!
//! A [`GeoIpConfig`] is a JSON document listing address groups:
//!
//! ```json
//! {
//!   "geoip": [
//!     { "country_code": "CN", "cidr": [{ "ip": [1, 0, 1, 0], "prefix": 24 }] },
//!     { "country_code": "PRIVATE", "reverse_match": true,
//!       "cidr": ["10.0.0.0/8", "fd00::/8"] },
//!     { "cidr": ["203.0.113.7"] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GeoIpError, Result};
use crate::types::Cidr;

/// One address group: a label, its polarity and its prefixes.
///
/// An empty `country_code` makes the group anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoIp {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub reverse_match: bool,
    #[serde(default)]
    pub cidr: Vec<Cidr>,
}

impl GeoIp {
    pub fn new(country_code: impl Into<String>, cidr: Vec<Cidr>) -> Self {
        Self {
            country_code: country_code.into(),
            reverse_match: false,
            cidr,
        }
    }

    /// Set reverse matching
    pub fn with_reverse_match(mut self, reverse_match: bool) -> Self {
        self.reverse_match = reverse_match;
        self
    }
}

/// A list of groups to register
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoIpConfig {
    #[serde(default)]
    pub geoip: Vec<GeoIp>,
}

impl GeoIpConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            GeoIpError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_cidr_shapes() {
        let text = r#"{
            "geoip": [
                { "country_code": "CN", "cidr": [{ "ip": [1, 0, 1, 0], "prefix": 24 }] },
                { "country_code": "PRIVATE", "reverse_match": true,
                  "cidr": ["10.0.0.0/8", "fd00::/8"] },
                { "cidr": ["203.0.113.7"] }
            ]
        }"#;
        let config = GeoIpConfig::from_json_str(text).unwrap();

        assert_eq!(config.geoip.len(), 3);
        assert_eq!(config.geoip[0].cidr, vec![Cidr::new([1, 0, 1, 0], 24)]);
        assert!(config.geoip[1].reverse_match);
        assert_eq!(config.geoip[1].cidr[1].ip.len(), 16);
        assert!(config.geoip[2].country_code.is_empty());
        assert_eq!(config.geoip[2].cidr[0].prefix, 32);
    }

    #[test]
    fn test_bad_textual_cidr_is_rejected() {
        let text = r#"{ "geoip": [{ "country_code": "XX", "cidr": ["10.0.0.0/64"] }] }"#;
        assert!(matches!(
            GeoIpConfig::from_json_str(text),
            Err(GeoIpError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = GeoIpConfig::from_file("/nonexistent/geoip.json").unwrap_err();
        assert!(matches!(err, GeoIpError::Config(_)));
    }

    #[test]
    fn test_builder_style_group() {
        let geoip = GeoIp::new("cn", vec![]).with_reverse_match(true);
        assert_eq!(geoip.country_code, "cn");
        assert!(geoip.reverse_match);
    }
}
