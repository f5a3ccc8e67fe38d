//! IP geolocation
//!
//! The analyzer only sees the [`LocationResolver`] trait. Three resolvers are
//! provided: the ip-api.com HTTP service, a local MaxMind GeoLite2-City
//! database, and a fixed table from configuration.
//!
//! Resolvers are untrusted oracles. A lookup either yields real coordinates
//! or fails; no resolver ever substitutes a default location.

pub mod ip_api;
pub mod maxmind;
pub mod static_table;

pub use ip_api::IpApiResolver;
pub use maxmind::MaxMindResolver;
pub use static_table::StaticResolver;

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{GeoProvider, GeolocationConfig};
use crate::models::Location;

/// Errors that can occur during geolocation lookups
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geolocation request timed out")]
    Timeout,

    #[error("Geolocation service returned status {0}")]
    Status(u16),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Malformed geolocation response: {0}")]
    Malformed(String),

    #[error("Failed to read database: {0}")]
    Database(#[from] maxminddb::MaxMindDBError),

    #[error("IP address not found in database")]
    NotFound,

    #[error("Location data missing for IP address")]
    NoLocation,

    #[error("Database file not found: {0}")]
    FileNotFound(String),
}

/// Maps an IP address to a location
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, ip: IpAddr) -> Result<Location, GeoError>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Build the resolver selected in configuration
pub fn build_resolver(config: &GeolocationConfig) -> Result<Arc<dyn LocationResolver>, GeoError> {
    let resolver: Arc<dyn LocationResolver> = match config.provider {
        GeoProvider::IpApi => Arc::new(IpApiResolver::new(
            &config.api_url,
            Duration::from_secs(config.timeout_secs),
        )?),
        GeoProvider::Maxmind => {
            let path = config
                .maxmind_database
                .as_ref()
                .ok_or_else(|| GeoError::FileNotFound("<unset>".to_string()))?;
            Arc::new(MaxMindResolver::new(path)?)
        }
        GeoProvider::Static => Arc::new(StaticResolver::from_config(&config.static_locations)?),
    };
    log::info!("Using {} geolocation resolver", resolver.name());
    Ok(resolver)
}

/// Reject coordinates outside the valid latitude/longitude ranges
pub(crate) fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), GeoError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(GeoError::Malformed(format!(
            "coordinates out of range: ({}, {})",
            latitude, longitude
        )));
    }
    Ok(())
}
