//! Impossible travel analysis
//!
//! Ties the resolver, the history store and the decision policy together.
//! Each analysis geolocates the login, then inside a per-subject critical
//! section reads the latest login, decides, and records the new login.

use chrono::{DateTime, FixedOffset};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};

use super::locks::{SubjectGuard, SubjectLocks};
use super::policy::{decide, Observation, Verdict, VerdictReason};
use crate::alerting::{AlertQueue, TravelAlert};
use crate::config::{Config, DetectionConfig};
use crate::error::TravelError;
use crate::geolocation::{build_resolver, LocationResolver};
use crate::models::{
    parse_timestamp, AnalysisResult, HistoryStats, Location, LoginRecord, NewLoginRecord,
    PurgeResult,
};
use crate::persistence::{HistoryStore, PersistenceError, SqliteHistoryStore};

const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Locks held for one subject's read-decide-write unit
///
/// Shared with every store call made inside the unit and released only once
/// the last of them has finished on the blocking pool, even if the caller
/// stopped waiting for it.
struct CriticalSection {
    _gate: OwnedRwLockReadGuard<()>,
    _subject: SubjectGuard,
}

pub struct ImpossibleTravelAnalyzer {
    resolver: Arc<dyn LocationResolver>,
    store: Arc<dyn HistoryStore>,
    config: DetectionConfig,
    storage_timeout: Duration,
    locks: SubjectLocks,
    /// Analyses hold the read side; `purge_all` takes the write side
    purge_gate: Arc<RwLock<()>>,
    alerts: Option<AlertQueue>,
}

impl ImpossibleTravelAnalyzer {
    pub fn new(
        resolver: Arc<dyn LocationResolver>,
        store: Arc<dyn HistoryStore>,
        config: DetectionConfig,
    ) -> Self {
        ImpossibleTravelAnalyzer {
            resolver,
            store,
            config,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            locks: SubjectLocks::new(),
            purge_gate: Arc::new(RwLock::new(())),
            alerts: None,
        }
    }

    /// Build the resolver and SQLite store described by `config`
    pub fn from_config(config: &Config, alerts: Option<AlertQueue>) -> Result<Self, TravelError> {
        let resolver = build_resolver(&config.geolocation)?;
        let store = SqliteHistoryStore::new(
            &config.storage.database_path,
            config.storage.busy_timeout(),
        )?;

        let mut analyzer = ImpossibleTravelAnalyzer::new(resolver, Arc::new(store), config.detection)
            .with_storage_timeout(config.storage.operation_timeout());
        analyzer.alerts = alerts;
        Ok(analyzer)
    }

    /// Bound on every history operation
    ///
    /// SQLite work cannot be cancelled once started, so this should exceed
    /// the connection's busy timeout.
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub fn with_alerts(mut self, alerts: AlertQueue) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyze one login for impossible travel
    ///
    /// Input is validated and the IP resolved before anything is read or
    /// written, so a rejected or un-geolocated login leaves no record.
    /// The login is recorded whatever the verdict.
    ///
    /// # Arguments
    ///
    /// * `subject` - User identifier (email or username), must not be empty
    /// * `source_ip` - IPv4 or IPv6 address of the login
    /// * `timestamp` - ISO-8601 time of the login; without an offset it is read as UTC
    ///
    /// # Errors
    ///
    /// * `TravelError::Validation` if any argument is malformed
    /// * `TravelError::Geolocation` if the IP cannot be resolved to coordinates
    /// * `TravelError::Storage` if the history could not be read or written,
    ///   including when the storage timeout expires
    pub async fn analyze(
        &self,
        subject: &str,
        source_ip: &str,
        timestamp: &str,
    ) -> Result<AnalysisResult, TravelError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(TravelError::Validation("user must not be empty".to_string()));
        }
        let ip = IpAddr::from_str(source_ip.trim())
            .map_err(|_| TravelError::Validation(format!("Invalid IP address: {}", source_ip)))?;
        let parsed_ts = parse_timestamp(timestamp)?;

        let location = self.resolver.resolve(ip).await.map_err(|e| {
            log::error!("Geolocation via {} failed for IP {}: {}", self.resolver.name(), ip, e);
            e
        })?;

        let (previous, verdict) = self.record_and_decide(subject, ip, &location, parsed_ts).await?;

        let result = build_result(
            subject,
            ip,
            location,
            timestamp,
            previous,
            &verdict,
        );

        if result.impossible_travel_detected {
            log::warn!("{} (user {})", result.message, subject);
            if let Some(ref alerts) = self.alerts {
                if let Some(alert) = TravelAlert::from_analysis(&result, &verdict, parsed_ts) {
                    alerts.queue_alert(alert);
                }
            }
        } else if verdict.reason == VerdictReason::FirstLogin {
            log::info!("First login detected for user {}", subject);
        } else {
            log::info!(
                "No impossible travel for user {}: {}",
                subject,
                verdict.reason.description()
            );
        }

        Ok(result)
    }

    /// The per-subject read-decide-write unit
    async fn record_and_decide(
        &self,
        subject: &str,
        ip: IpAddr,
        location: &Location,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<(Option<LoginRecord>, Verdict), TravelError> {
        let gate = Arc::clone(&self.purge_gate).read_owned().await;
        let section = Arc::new(CriticalSection {
            _gate: gate,
            _subject: self.locks.acquire(subject).await,
        });

        let key = subject.to_string();
        let previous = self
            .with_store(Arc::clone(&section), move |store| store.latest(&key))
            .await?;

        let verdict = decide(
            previous.as_ref(),
            &Observation { location, timestamp },
            &self.config,
        );
        if let (Some(d), Some(dt)) = (verdict.distance_km, verdict.elapsed_minutes) {
            log::debug!(
                "User {}: distance={:.2}km time={:.2}min detected={} ({})",
                subject,
                d,
                dt,
                verdict.detected,
                verdict.reason.description()
            );
        }

        let record = NewLoginRecord {
            subject: subject.to_string(),
            source_ip: ip.to_string(),
            location: location.clone(),
            timestamp,
        };
        let max_records = self.config.max_records_per_subject;
        self.with_store(section, move |store| store.insert(&record, max_records))
            .await?;

        Ok((previous, verdict))
    }

    /// Delete all login history
    pub async fn purge_all(&self) -> Result<PurgeResult, TravelError> {
        let gate = Arc::clone(&self.purge_gate).write_owned().await;
        let records_deleted = self.with_store(gate, |store| store.purge_all()).await?;
        Ok(PurgeResult {
            success: true,
            message: format!(
                "Successfully purged {} records from database",
                records_deleted
            ),
            records_deleted,
        })
    }

    pub async fn stats(&self) -> Result<HistoryStats, TravelError> {
        Ok(self.with_store((), |store| store.stats()).await?)
    }

    /// Most recent logins for a subject, newest first
    pub async fn history(&self, subject: &str, limit: usize) -> Result<Vec<LoginRecord>, TravelError> {
        let key = subject.to_string();
        Ok(self.with_store((), move |store| store.recent(&key, limit)).await?)
    }

    /// Run a store operation on the blocking pool under the storage timeout
    ///
    /// `held` (lock guards) moves into the blocking task and is dropped when
    /// the operation itself ends. A timed-out operation therefore keeps its
    /// locks until SQLite is done with it.
    async fn with_store<T, H, F>(&self, held: H, op: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        H: Send + 'static,
        F: FnOnce(&dyn HistoryStore) -> Result<T, PersistenceError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            let result = op(store.as_ref());
            drop(held);
            result
        });

        let result = match tokio::time::timeout(self.storage_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(PersistenceError::Task(join_error.to_string())),
            Err(_) => Err(PersistenceError::Timeout(self.storage_timeout)),
        };
        if let Err(ref e) = result {
            log::error!("History store operation failed: {}", e);
        }
        result
    }
}

fn build_result(
    subject: &str,
    ip: IpAddr,
    location: Location,
    raw_timestamp: &str,
    previous: Option<LoginRecord>,
    verdict: &Verdict,
) -> AnalysisResult {
    let distance_km = verdict.distance_km.unwrap_or_default();
    let minutes = verdict.elapsed_minutes.unwrap_or_default();

    let message = match (&previous, verdict.reason) {
        (None, _) => "First login for this user".to_string(),
        (Some(prev), VerdictReason::CountryChange) => format!(
            "IMPOSSIBLE TRAVEL DETECTED: User logged in from {} and then from {} within {:.2} minutes ({:.2} km apart)",
            prev.location.country, location.country, minutes, distance_km
        ),
        (Some(prev), VerdictReason::DistantRelocation) => format!(
            "IMPOSSIBLE TRAVEL DETECTED: User logged in from {}, {} and then from {}, {} within {:.2} minutes ({:.2} km apart)",
            prev.location.city, prev.location.country, location.city, location.country, minutes, distance_km
        ),
        (Some(_), _) => "Normal travel pattern".to_string(),
    };

    AnalysisResult {
        subject: subject.to_string(),
        current_ip: ip.to_string(),
        current_location: location,
        current_timestamp: raw_timestamp.to_string(),
        impossible_travel_detected: verdict.detected,
        previous_login: previous,
        distance_km: verdict.distance_km.map(round2),
        time_difference_minutes: verdict.elapsed_minutes.map(round2),
        message,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::AlertDispatcher;
    use crate::config::{GeoProvider, StaticLocation};
    use crate::detection::distance::haversine_km;
    use crate::geolocation::StaticResolver;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const US_IP: &str = "198.51.100.1";
    const CANADA_IP: &str = "198.51.100.2";
    const TORONTO_IP: &str = "198.51.100.3";
    const OSHAWA_IP: &str = "198.51.100.4";
    const UNKNOWN_IP: &str = "203.0.113.99";
    const T: &str = "2025-12-10T10:00:00Z";

    fn new_york() -> Location {
        Location::new("United States", "New York", 40.7128, -74.0060)
    }

    fn montreal() -> Location {
        Location::new("Canada", "Montreal", 45.5017, -73.5673)
    }

    fn resolver() -> Arc<StaticResolver> {
        Arc::new(
            StaticResolver::new()
                .with(US_IP.parse().unwrap(), new_york())
                .with(CANADA_IP.parse().unwrap(), montreal())
                .with(TORONTO_IP.parse().unwrap(), Location::new("Canada", "Toronto", 43.6532, -79.3832))
                .with(OSHAWA_IP.parse().unwrap(), Location::new("Canada", "Oshawa", 43.8971, -78.8658)),
        )
    }

    fn analyzer_with(config: DetectionConfig) -> (ImpossibleTravelAnalyzer, Arc<SqliteHistoryStore>) {
        let store = Arc::new(SqliteHistoryStore::in_memory().unwrap());
        let analyzer = ImpossibleTravelAnalyzer::new(resolver(), store.clone(), config);
        (analyzer, store)
    }

    fn analyzer() -> (ImpossibleTravelAnalyzer, Arc<SqliteHistoryStore>) {
        analyzer_with(DetectionConfig::default())
    }

    #[tokio::test]
    async fn test_first_login_is_recorded() {
        let (analyzer, store) = analyzer();
        let result = analyzer.analyze("new@x.com", US_IP, T).await.unwrap();

        assert!(!result.impossible_travel_detected);
        assert_eq!(result.message, "First login for this user");
        assert!(result.previous_login.is_none());
        assert!(result.distance_km.is_none());
        assert_eq!(result.current_timestamp, T);
        assert_eq!(store.stats().unwrap().total_records, 1);
    }

    #[tokio::test]
    async fn test_country_change_within_window_detected() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("u@x.com", US_IP, T).await.unwrap();
        let result = analyzer
            .analyze("u@x.com", CANADA_IP, "2025-12-10T10:05:00Z")
            .await
            .unwrap();

        assert!(result.impossible_travel_detected);
        assert_eq!(result.time_difference_minutes, Some(5.0));
        let expected = round2(haversine_km(40.7128, -74.0060, 45.5017, -73.5673));
        assert_eq!(result.distance_km, Some(expected));
        assert!(result.message.starts_with(
            "IMPOSSIBLE TRAVEL DETECTED: User logged in from United States and then from Canada within 5.00 minutes"
        ));
        assert_eq!(result.previous_login.unwrap().location, new_york());
    }

    #[tokio::test]
    async fn test_outside_window_not_detected() {
        let (analyzer, store) = analyzer();
        analyzer.analyze("u@x.com", US_IP, T).await.unwrap();
        let result = analyzer
            .analyze("u@x.com", CANADA_IP, "2025-12-10T16:00:00Z")
            .await
            .unwrap();

        assert!(!result.impossible_travel_detected);
        assert_eq!(result.message, "Normal travel pattern");
        assert_eq!(result.time_difference_minutes, Some(360.0));
        assert_eq!(store.stats().unwrap().total_records, 2);
    }

    #[tokio::test]
    async fn test_same_country_below_distance_not_detected() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("u@x.com", TORONTO_IP, T).await.unwrap();
        let result = analyzer
            .analyze("u@x.com", OSHAWA_IP, "2025-12-10T10:03:00Z")
            .await
            .unwrap();

        let distance = result.distance_km.unwrap();
        assert!(distance > 30.0 && distance < 100.0, "got {}", distance);
        assert!(!result.impossible_travel_detected);
    }

    #[tokio::test]
    async fn test_same_country_distant_relocation_message() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("u@x.com", TORONTO_IP, T).await.unwrap();
        let result = analyzer
            .analyze("u@x.com", CANADA_IP, "2025-12-10T10:03:00+00:00")
            .await
            .unwrap();

        assert!(result.impossible_travel_detected);
        assert!(result
            .message
            .contains("from Toronto, Canada and then from Montreal, Canada within 3.00 minutes"));
    }

    #[tokio::test]
    async fn test_late_event_compares_against_true_latest() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("u@x.com", US_IP, "2025-12-10T10:10:00Z").await.unwrap();
        analyzer.analyze("u@x.com", US_IP, "2025-12-10T09:00:00Z").await.unwrap();

        let result = analyzer
            .analyze("u@x.com", CANADA_IP, "2025-12-10T10:12:00Z")
            .await
            .unwrap();
        assert!(result.impossible_travel_detected);
        assert_eq!(result.time_difference_minutes, Some(2.0));
    }

    #[tokio::test]
    async fn test_resolver_failure_persists_nothing() {
        let (analyzer, store) = analyzer();
        let err = analyzer.analyze("u@x.com", UNKNOWN_IP, T).await.unwrap_err();
        assert_eq!(err.kind(), "geolocation_error");
        assert_eq!(store.stats().unwrap().total_records, 0);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (analyzer, store) = analyzer();

        let cases = [("", US_IP, T), ("u@x.com", "999.1.1.1", T), ("u@x.com", US_IP, "not a time")];
        for (user, ip, ts) in cases {
            let err = analyzer.analyze(user, ip, ts).await.unwrap_err();
            assert_eq!(err.kind(), "validation_error", "case {:?}", (user, ip, ts));
        }
        assert_eq!(store.stats().unwrap().total_records, 0);
    }

    #[tokio::test]
    async fn test_retention_through_analyzer() {
        let (analyzer, store) = analyzer_with(DetectionConfig {
            max_records_per_subject: 3,
            ..DetectionConfig::default()
        });
        for hour in 0..6 {
            let ts = format!("2025-12-10T{:02}:00:00Z", hour + 1);
            analyzer.analyze("u@x.com", US_IP, &ts).await.unwrap();
        }
        let history = analyzer.history("u@x.com", 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].timestamp.to_rfc3339(), "2025-12-10T06:00:00+00:00");
        assert_eq!(store.stats().unwrap().total_records, 3);
    }

    #[tokio::test]
    async fn test_purge_and_stats() {
        let (analyzer, _) = analyzer();
        for i in 0..42 {
            let user = format!("user{}@x.com", i % 7);
            let ts = format!("2025-12-10T10:{:02}:00Z", i);
            analyzer.analyze(&user, US_IP, &ts).await.unwrap();
        }
        assert_eq!(
            analyzer.stats().await.unwrap(),
            HistoryStats { total_records: 42, unique_users: 7 }
        );

        let purge = analyzer.purge_all().await.unwrap();
        assert!(purge.success);
        assert_eq!(purge.records_deleted, 42);
        assert_eq!(purge.message, "Successfully purged 42 records from database");
        assert_eq!(analyzer.stats().await.unwrap().total_records, 0);
    }

    #[tokio::test]
    async fn test_detection_queues_alert() {
        let (analyzer, _) = analyzer();
        let (queue, mut rx) = AlertDispatcher::create_channel();
        let analyzer = analyzer.with_alerts(queue);

        analyzer.analyze("u@x.com", US_IP, T).await.unwrap();
        assert!(rx.try_recv().is_err());

        analyzer.analyze("u@x.com", CANADA_IP, "2025-12-10T10:05:00Z").await.unwrap();
        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.user, "u@x.com");
        assert_eq!(alert.previous_ip, US_IP);
        assert_eq!(alert.severity, 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_logins_for_one_subject_are_serialized() {
        let (analyzer, store) = analyzer_with(DetectionConfig {
            max_records_per_subject: 50,
            ..DetectionConfig::default()
        });
        let analyzer = Arc::new(analyzer);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let analyzer = analyzer.clone();
            handles.push(tokio::spawn(async move {
                analyzer.analyze("u@x.com", US_IP, T).await.unwrap()
            }));
        }

        let mut first_logins = 0;
        let mut seen = HashSet::new();
        for handle in handles {
            let result = handle.await.unwrap();
            match result.previous_login {
                None => first_logins += 1,
                Some(previous) => assert!(seen.insert(previous.id), "two analyses saw record {}", previous.id),
            }
        }

        assert_eq!(first_logins, 1);
        assert_eq!(seen.len(), 15);
        assert_eq!(store.stats().unwrap().total_records, 16);
    }

    struct SlowStore;

    impl HistoryStore for SlowStore {
        fn latest(&self, _subject: &str) -> Result<Option<LoginRecord>, PersistenceError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(None)
        }
        fn insert(&self, _record: &NewLoginRecord, _max: usize) -> Result<usize, PersistenceError> {
            Ok(0)
        }
        fn recent(&self, _subject: &str, _limit: usize) -> Result<Vec<LoginRecord>, PersistenceError> {
            Ok(Vec::new())
        }
        fn purge_all(&self) -> Result<usize, PersistenceError> {
            Err(PersistenceError::InvalidData("read-only".to_string()))
        }
        fn stats(&self) -> Result<HistoryStats, PersistenceError> {
            Ok(HistoryStats { total_records: 0, unique_users: 0 })
        }
    }

    #[tokio::test]
    async fn test_storage_timeout_is_typed() {
        let analyzer = ImpossibleTravelAnalyzer::new(resolver(), Arc::new(SlowStore), DetectionConfig::default())
            .with_storage_timeout(Duration::from_millis(20));

        let err = analyzer.analyze("u@x.com", US_IP, T).await.unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(err.is_timeout());
    }

    /// Delays the first `slow_inserts` inserts, then behaves like SQLite
    struct DelayedInsertStore {
        inner: SqliteHistoryStore,
        slow_inserts: AtomicUsize,
        delay: Duration,
    }

    impl DelayedInsertStore {
        fn new(slow_inserts: usize, delay: Duration) -> Self {
            DelayedInsertStore {
                inner: SqliteHistoryStore::in_memory().unwrap(),
                slow_inserts: AtomicUsize::new(slow_inserts),
                delay,
            }
        }
    }

    impl HistoryStore for DelayedInsertStore {
        fn latest(&self, subject: &str) -> Result<Option<LoginRecord>, PersistenceError> {
            self.inner.latest(subject)
        }
        fn insert(&self, record: &NewLoginRecord, max: usize) -> Result<usize, PersistenceError> {
            let slow = self
                .slow_inserts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if slow {
                std::thread::sleep(self.delay);
            }
            self.inner.insert(record, max)
        }
        fn recent(&self, subject: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError> {
            self.inner.recent(subject, limit)
        }
        fn purge_all(&self) -> Result<usize, PersistenceError> {
            self.inner.purge_all()
        }
        fn stats(&self) -> Result<HistoryStats, PersistenceError> {
            self.inner.stats()
        }
    }

    #[tokio::test]
    async fn test_purge_waits_for_timed_out_insert() {
        let store = Arc::new(DelayedInsertStore::new(1, Duration::from_millis(300)));
        let analyzer = ImpossibleTravelAnalyzer::new(resolver(), store.clone(), DetectionConfig::default())
            .with_storage_timeout(Duration::from_millis(50));

        let err = analyzer.analyze("u@x.com", US_IP, T).await.unwrap_err();
        assert!(err.is_timeout());

        let purge = analyzer.purge_all().await.unwrap();
        assert_eq!(purge.records_deleted, 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.stats().unwrap().total_records, 0);
    }

    #[tokio::test]
    async fn test_next_analysis_waits_for_timed_out_insert() {
        let store = Arc::new(DelayedInsertStore::new(1, Duration::from_millis(300)));
        let analyzer = ImpossibleTravelAnalyzer::new(resolver(), store.clone(), DetectionConfig::default())
            .with_storage_timeout(Duration::from_millis(50));

        let err = analyzer.analyze("u@x.com", US_IP, T).await.unwrap_err();
        assert!(err.is_timeout());

        let result = analyzer
            .analyze("u@x.com", CANADA_IP, "2025-12-10T10:05:00Z")
            .await
            .unwrap();
        let previous = result.previous_login.expect("first login should be the baseline");
        assert_eq!(previous.source_ip, US_IP);
        assert!(result.impossible_travel_detected);
        assert_eq!(store.stats().unwrap().total_records, 2);
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let analyzer = ImpossibleTravelAnalyzer::new(resolver(), Arc::new(SlowStore), DetectionConfig::default());
        let err = analyzer.purge_all().await.unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path = dir.path().join("history.db");
        config.geolocation.provider = GeoProvider::Static;
        config.geolocation.static_locations.insert(
            US_IP.to_string(),
            StaticLocation {
                country: "United States".to_string(),
                city: "New York".to_string(),
                latitude: 40.7128,
                longitude: -74.0060,
            },
        );

        let analyzer = ImpossibleTravelAnalyzer::from_config(&config, None).unwrap();
        let result = analyzer.analyze("u@x.com", US_IP, T).await.unwrap();
        assert_eq!(result.current_location, new_york());
        assert!(config.storage.database_path.exists());
    }
}
