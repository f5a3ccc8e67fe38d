//! Impossible travel decision policy
//!
//! Compares a login against the subject's most recent recorded login and
//! decides whether the move between them is physically implausible.

use chrono::{DateTime, FixedOffset};

use super::distance::{elapsed_minutes, haversine_km};
use crate::config::DetectionConfig;
use crate::models::{Location, LoginRecord};

/// The login being evaluated
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub location: &'a Location,
    pub timestamp: DateTime<FixedOffset>,
}

/// Why the policy reached its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictReason {
    FirstLogin,
    OutsideTimeWindow,
    CountryChange,
    DistantRelocation,
    BelowDistanceThreshold,
    UnknownCountry,
}

impl VerdictReason {
    pub fn description(&self) -> &'static str {
        match self {
            VerdictReason::FirstLogin => "first login for this subject",
            VerdictReason::OutsideTimeWindow => "logins too far apart in time",
            VerdictReason::CountryChange => "different countries within window",
            VerdictReason::DistantRelocation => "same-country distant relocation within window",
            VerdictReason::BelowDistanceThreshold => "distance below threshold",
            VerdictReason::UnknownCountry => "country unknown for one of the logins",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub detected: bool,
    pub reason: VerdictReason,
    /// Great-circle distance to the previous login, if there was one
    pub distance_km: Option<f64>,
    /// Minutes since the previous login, if there was one
    pub elapsed_minutes: Option<f64>,
}

impl Verdict {
    fn first_login() -> Self {
        Verdict {
            detected: false,
            reason: VerdictReason::FirstLogin,
            distance_km: None,
            elapsed_minutes: None,
        }
    }
}

/// Decide whether `current` is impossible travel relative to `previous`
///
/// The time window is an exclusive cutoff (`dt > window` never detects) while
/// the distance threshold is inclusive (`d >= min_distance_km` detects).
/// A country change between two known countries always detects within the
/// window. An unknown country on either side is neither "same" nor
/// "different" and never detects.
pub fn decide(
    previous: Option<&LoginRecord>,
    current: &Observation<'_>,
    config: &DetectionConfig,
) -> Verdict {
    let previous = match previous {
        Some(previous) => previous,
        None => return Verdict::first_login(),
    };

    let dt = elapsed_minutes(&previous.timestamp, &current.timestamp);
    let d = haversine_km(
        previous.location.latitude,
        previous.location.longitude,
        current.location.latitude,
        current.location.longitude,
    );

    let (detected, reason) = if dt > config.time_window_minutes as f64 {
        (false, VerdictReason::OutsideTimeWindow)
    } else {
        match (previous.location.known_country(), current.location.known_country()) {
            (Some(prev), Some(curr)) if prev != curr => (true, VerdictReason::CountryChange),
            (Some(_), Some(_)) if d >= config.min_distance_km => {
                (true, VerdictReason::DistantRelocation)
            }
            (Some(_), Some(_)) => (false, VerdictReason::BelowDistanceThreshold),
            _ => (false, VerdictReason::UnknownCountry),
        }
    };

    Verdict {
        detected,
        reason,
        distance_km: Some(d),
        elapsed_minutes: Some(dt),
    }
}
