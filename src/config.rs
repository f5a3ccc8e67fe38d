use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Configuration for the impossible travel service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub storage: StorageConfig,
    pub geolocation: GeolocationConfig,
    pub alerting: AlertConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub bind_address: String,
    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
}

/// Detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum minutes between two logins for them to be compared
    pub time_window_minutes: u64,
    /// Retention cap on stored logins per subject
    pub max_records_per_subject: usize,
    /// Minimum same-country distance that counts as impossible travel
    pub min_distance_km: f64,
}

/// History storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Upper bound on a single history operation
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoProvider {
    IpApi,
    Maxmind,
    Static,
}

/// Location resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub provider: GeoProvider,
    /// URL template for the ip-api provider; `{ip}` is replaced by the address
    pub api_url: String,
    pub timeout_secs: u64,
    /// Path to a GeoLite2-City database for the maxmind provider
    pub maxmind_database: Option<PathBuf>,
    /// Fixed IP to location table for the static provider
    pub static_locations: HashMap<String, StaticLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticLocation {
    pub country: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Alerts below this severity are not dispatched
    pub min_severity: u8,
    pub slack: Option<SlackConfig>,
    pub discord: Option<DiscordConfig>,
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub channel: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:80".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            time_window_minutes: 5,
            max_records_per_subject: 10,
            min_distance_km: 100.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database_path: PathBuf::from("./data/impossible_travel.db"),
            busy_timeout_ms: 5_000,
            operation_timeout_ms: 10_000,
        }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        GeolocationConfig {
            provider: GeoProvider::IpApi,
            api_url: "http://ip-api.com/json/{ip}?fields=status,message,country,city,lat,lon"
                .to_string(),
            timeout_secs: 10,
            maxmind_database: None,
            static_locations: HashMap::new(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            enabled: false,
            min_severity: 7,
            slack: None,
            discord: None,
            webhooks: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from `path` if it exists, otherwise start from defaults, then
    /// apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Config::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an explicit override source
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            Config::from_file(path)?
        } else {
            log::warn!("Config file {:?} not found, using defaults", path);
            Config::default()
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides using the service's environment variable names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("IMPOSSIBLE_TRAVEL_TIME_WINDOW") {
            self.detection.time_window_minutes = parse_var("IMPOSSIBLE_TRAVEL_TIME_WINDOW", &value)?;
        }
        if let Some(value) = lookup("MAX_RECORDS_PER_USER") {
            self.detection.max_records_per_subject = parse_var("MAX_RECORDS_PER_USER", &value)?;
        }
        if let Some(value) = lookup("MIN_DISTANCE_KM") {
            self.detection.min_distance_km = parse_var("MIN_DISTANCE_KM", &value)?;
        }
        if let Some(value) = lookup("DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.server.log_level = value.to_lowercase();
        }

        let host = lookup("API_HOST");
        let port = lookup("API_PORT");
        if host.is_some() || port.is_some() {
            let (current_host, current_port) = self
                .server
                .bind_address
                .rsplit_once(':')
                .map(|(h, p)| (h.to_string(), p.to_string()))
                .unwrap_or_else(|| (self.server.bind_address.clone(), "80".to_string()));
            let port = match port {
                Some(port) => parse_var::<u16>("API_PORT", &port)?.to_string(),
                None => current_port,
            };
            self.server.bind_address = format!("{}:{}", host.unwrap_or(current_host), port);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.time_window_minutes == 0 {
            return Err(invalid("detection.time_window_minutes", "must be greater than zero"));
        }
        if self.detection.max_records_per_subject == 0 {
            return Err(invalid("detection.max_records_per_subject", "must be at least 1"));
        }
        if !self.detection.min_distance_km.is_finite() || self.detection.min_distance_km < 0.0 {
            return Err(invalid("detection.min_distance_km", "must be a non-negative number"));
        }
        if self.geolocation.provider == GeoProvider::Maxmind && self.geolocation.maxmind_database.is_none() {
            return Err(invalid("geolocation.maxmind_database", "required for the maxmind provider"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, &format!("cannot parse {:?}", value)))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}
