//! Fixed IP to location table
//!
//! Useful in labs and tests where lookups must be deterministic and offline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

use super::{check_coordinates, GeoError, LocationResolver};
use crate::config::StaticLocation;
use crate::models::Location;

#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<IpAddr, Location>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(entries: &HashMap<String, StaticLocation>) -> Result<Self, GeoError> {
        let mut resolver = StaticResolver::new();
        for (ip, entry) in entries {
            let ip = IpAddr::from_str(ip)
                .map_err(|_| GeoError::Malformed(format!("invalid IP in static table: {}", ip)))?;
            check_coordinates(entry.latitude, entry.longitude)?;
            resolver.table.insert(
                ip,
                Location::new(&entry.country, &entry.city, entry.latitude, entry.longitude),
            );
        }
        Ok(resolver)
    }

    /// Builder-style insert
    pub fn with(mut self, ip: IpAddr, location: Location) -> Self {
        self.table.insert(ip, location);
        self
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl LocationResolver for StaticResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<Location, GeoError> {
        self.table.get(&ip).cloned().ok_or(GeoError::NotFound)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
