use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::export::ExportSettings;
use crate::stations::{self, Station, DEFAULT_STATION_BASE_URL};
use crate::utils;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid STATIONS entry: {0}")]
    InvalidStation(&'static str),
    #[error("Unknown station in STATIONS: {0}")]
    UnknownStation(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub station_base_url: String,
    /// Subset of catalogue stations; empty means the full catalogue
    pub station_ids: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub cache_ttl_minutes: u64,
    /// 0 disables the background refresh scheduler
    pub refresh_interval_minutes: u64,
    pub snapshot_path: Option<PathBuf>,
    pub coordinates_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            station_base_url: DEFAULT_STATION_BASE_URL.to_string(),
            station_ids: Vec::new(),
            fetch_timeout_secs: 30,
            fetch_concurrency: 8,
            cache_ttl_minutes: 60,
            refresh_interval_minutes: 0,
            snapshot_path: Some(PathBuf::from("combined_uk_station_climate_data.csv")),
            coordinates_path: Some(PathBuf::from("station_coordinates.csv")),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let station_ids = match env::var("STATIONS") {
            Ok(list) => utils::parse_station_list(&list).map_err(ConfigError::InvalidStation)?,
            Err(_) => Vec::new(),
        };
        if let Some(unknown) = station_ids.iter().find(|id| !stations::is_known_station(id)) {
            return Err(ConfigError::UnknownStation(unknown.clone()));
        }

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(defaults.server_port),
            station_base_url: env::var("STATION_BASE_URL").unwrap_or(defaults.station_base_url),
            station_ids,
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(defaults.fetch_timeout_secs),
            fetch_concurrency: env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(defaults.fetch_concurrency),
            cache_ttl_minutes: env::var("CACHE_TTL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(defaults.cache_ttl_minutes),
            refresh_interval_minutes: env::var("REFRESH_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(defaults.refresh_interval_minutes),
            snapshot_path: optional_path("SNAPSHOT_PATH", defaults.snapshot_path),
            coordinates_path: optional_path("COORDINATES_PATH", defaults.coordinates_path),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Configured stations resolved to bulletin URLs
    pub fn stations(&self) -> Result<Vec<Station>, ConfigError> {
        if self.station_ids.is_empty() {
            return Ok(stations::station_catalogue(&self.station_base_url));
        }
        stations::select_stations(&self.station_base_url, &self.station_ids)
            .map_err(ConfigError::UnknownStation)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    /// Period of the background refresh, `None` when the scheduler is disabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_minutes > 0)
            .then(|| Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60)))
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            snapshot_path: self.snapshot_path.clone(),
            coordinates_path: self.coordinates_path.clone(),
        }
    }
}

/// Path from the environment; an empty value disables the export
fn optional_path(key: &str, default: Option<PathBuf>) -> Option<PathBuf> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(PathBuf::from(value)),
        Err(_) => default,
    }
}
