pub mod login;

pub use login::{
    parse_timestamp, AnalysisResult, HistoryStats, Location, LoginQuery, LoginRecord,
    NewLoginRecord, PurgeResult,
};
