use thiserror::Error;

use crate::matcher::BatchOutcome;
use crate::types::IpFamily;

/// GeoIP engine error types
#[derive(Error, Debug)]
pub enum GeoIpError {
    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Failed to normalize {family} set: {message}")]
    SetNormalization { family: IpFamily, message: String },

    /// A later family failed after an earlier one was already swapped in.
    /// `outcome` reports what stayed applied.
    #[error("Batch partially applied: {source}")]
    PartialUpdate {
        outcome: BatchOutcome,
        source: Box<GeoIpError>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeoIpError>;
