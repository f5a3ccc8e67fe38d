pub mod alerting;
pub mod api;
pub mod config;
pub mod detection;
pub mod error;
pub mod geolocation;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use alerting::{AlertDispatcher, AlertQueue, TravelAlert};
pub use config::{Config, DetectionConfig};
pub use detection::{decide, haversine_km, ImpossibleTravelAnalyzer, Verdict, VerdictReason};
pub use error::TravelError;
pub use geolocation::{LocationResolver, StaticResolver};
pub use models::{AnalysisResult, Location, LoginRecord};
pub use persistence::{HistoryStore, SqliteHistoryStore};
