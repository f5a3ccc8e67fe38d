//! Errors surfaced by the analysis engine to its callers

use thiserror::Error;

use crate::geolocation::GeoError;
use crate::persistence::PersistenceError;

#[derive(Error, Debug)]
pub enum TravelError {
    /// Malformed input, rejected before any side effect
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The source IP could not be resolved to a usable location
    #[error("Geolocation failed: {0}")]
    Geolocation(#[from] GeoError),

    /// Reading or writing login history failed
    #[error("Storage failure: {0}")]
    Storage(#[from] PersistenceError),
}

impl TravelError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            TravelError::Validation(_) => "validation_error",
            TravelError::Geolocation(_) => "geolocation_error",
            TravelError::Storage(_) => "storage_error",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TravelError::Geolocation(GeoError::Timeout)
                | TravelError::Storage(PersistenceError::Timeout(_))
        )
    }
}
