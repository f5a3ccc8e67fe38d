use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TravelError;

/// Resolved location of a source IP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(country: &str, city: &str, latitude: f64, longitude: f64) -> Self {
        Location {
            country: country.to_string(),
            city: city.to_string(),
            latitude,
            longitude,
        }
    }

    /// Country name, or `None` when the resolver could not provide one
    pub fn known_country(&self) -> Option<&str> {
        let country = self.country.trim();
        if country.is_empty() || country.eq_ignore_ascii_case("unknown") {
            None
        } else {
            Some(country)
        }
    }
}

/// A login that has been geolocated but not yet persisted
#[derive(Debug, Clone)]
pub struct NewLoginRecord {
    pub subject: String,
    pub source_ip: String,
    pub location: Location,
    pub timestamp: DateTime<FixedOffset>,
}

/// One persisted login in a subject's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRecord {
    /// Insert sequence assigned by the store
    pub id: i64,
    #[serde(rename = "user")]
    pub subject: String,
    #[serde(rename = "ip")]
    pub source_ip: String,
    #[serde(flatten)]
    pub location: Location,
    pub timestamp: DateTime<FixedOffset>,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of analyzing a single login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "user")]
    pub subject: String,
    pub current_ip: String,
    pub current_location: Location,
    pub current_timestamp: String,
    pub impossible_travel_detected: bool,
    pub previous_login: Option<LoginRecord>,
    pub distance_km: Option<f64>,
    pub time_difference_minutes: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeResult {
    pub success: bool,
    pub message: String,
    pub records_deleted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_records: usize,
    pub unique_users: usize,
}

/// Structured form of an inbound analyze request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginQuery {
    pub user: String,
    pub ip: String,
    pub ts: String,
}

impl LoginQuery {
    /// Parse the pipe-delimited form `user=...|ip=...|ts=...`
    ///
    /// The whole query is percent-decoded first, so callers may pass it
    /// either raw or still encoded. Unknown keys are ignored.
    pub fn parse(query: &str) -> Result<Self, TravelError> {
        let decoded = urlencoding::decode(query)
            .map_err(|e| TravelError::Validation(format!("Query is not valid UTF-8: {}", e)))?;
        log::debug!("Decoded query: {}", decoded);

        let mut user = None;
        let mut ip = None;
        let mut ts = None;

        for param in decoded.split('|') {
            if let Some((key, value)) = param.split_once('=') {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match key.trim() {
                    "user" => user = Some(value.to_string()),
                    "ip" => ip = Some(value.to_string()),
                    "ts" => ts = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let mut missing = Vec::new();
        if user.is_none() {
            missing.push("user");
        }
        if ip.is_none() {
            missing.push("ip");
        }
        if ts.is_none() {
            missing.push("ts");
        }
        if !missing.is_empty() {
            return Err(TravelError::Validation(format!(
                "Missing required parameters: {}. Expected format: user=email|ip=1.2.3.4|ts=2025-12-10T10:17:54",
                missing.join(", ")
            )));
        }

        Ok(LoginQuery {
            user: user.unwrap_or_default(),
            ip: ip.unwrap_or_default(),
            ts: ts.unwrap_or_default(),
        })
    }
}

/// Parse an ISO-8601 timestamp
///
/// Accepts RFC 3339 (`Z` or a numeric offset). A timestamp without any offset
/// is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, TravelError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    Err(TravelError::Validation(format!(
        "Invalid timestamp format: {}",
        raw
    )))
}
