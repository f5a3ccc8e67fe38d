//! Resolver backed by a local MaxMind GeoLite2-City database
//!
//! The database must be downloaded separately from MaxMind (free with
//! registration) and its path set in `geolocation.maxmind_database`.

use async_trait::async_trait;
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use super::{check_coordinates, GeoError, LocationResolver};
use crate::models::Location;

#[derive(Clone)]
pub struct MaxMindResolver {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindResolver {
    /// Open a GeoLite2-City database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, GeoError> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(GeoError::FileNotFound(path.display().to_string()));
        }

        let reader = Reader::open_readfile(path)?;
        Ok(MaxMindResolver {
            reader: Arc::new(reader),
        })
    }

    /// Look up an address synchronously
    ///
    /// Country and city use the English names; either may be empty when the
    /// database has no name for it. Missing coordinates are an error.
    pub fn lookup(&self, ip: IpAddr) -> Result<Location, GeoError> {
        let city: geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound,
            other => GeoError::Database(other),
        })?;

        let location = city.location.ok_or(GeoError::NoLocation)?;
        let latitude = location.latitude.ok_or(GeoError::NoLocation)?;
        let longitude = location.longitude.ok_or(GeoError::NoLocation)?;
        check_coordinates(latitude, longitude)?;

        let city_name = city
            .city
            .and_then(|c| c.names)
            .and_then(|n| n.get("en").copied())
            .unwrap_or_default();
        let country_name = city
            .country
            .and_then(|c| c.names)
            .and_then(|n| n.get("en").copied())
            .unwrap_or_default();

        Ok(Location {
            country: country_name.to_string(),
            city: city_name.to_string(),
            latitude,
            longitude,
        })
    }
}

#[async_trait]
impl LocationResolver for MaxMindResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<Location, GeoError> {
        self.lookup(ip)
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}
