pub mod analyzer;
pub mod distance;
pub mod locks;
pub mod policy;

pub use analyzer::ImpossibleTravelAnalyzer;
pub use distance::{elapsed_minutes, haversine_km, GeoPoint};
pub use locks::SubjectLocks;
pub use policy::{decide, Observation, Verdict, VerdictReason};
