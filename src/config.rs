use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::distance::DEFAULT_SEARCH_RADIUS_KM;
use crate::models::{Coordinate, RecommendParams};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub geocoding: GeocodingSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub recommend: RecommendSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_events_table")]
    pub events_table: String,
    #[serde(default = "default_event_tags_table")]
    pub event_tags_table: String,
    #[serde(default = "default_profile_tags_table")]
    pub profile_tags_table: String,
    #[serde(default = "default_near_events_rpc")]
    pub near_events_rpc: String,
}

fn default_events_table() -> String { "events".to_string() }
fn default_event_tags_table() -> String { "event_tags".to_string() }
fn default_profile_tags_table() -> String { "profile_tags".to_string() }
fn default_near_events_rpc() -> String { "get_events_with_interest".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSettings {
    #[serde(default = "default_geocoding_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_country")]
    pub country: Option<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_url(),
            api_key: String::new(),
            country: default_country(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_geocoding_url() -> String { "https://maps.googleapis.com/maps/api".to_string() }
fn default_country() -> Option<String> { Some("uk".to_string()) }
fn default_debounce_ms() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Radius applied when a request does not set one
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    /// Radius for the wide near-point fetch from the data store
    #[serde(default = "default_fetch_radius_km")]
    pub fetch_radius_km: f64,
    /// Fallback origin when the device location is unavailable
    #[serde(default = "default_origin")]
    pub default_origin: [f64; 2],
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            fetch_radius_km: default_fetch_radius_km(),
            default_origin: default_origin(),
        }
    }
}

impl SearchSettings {
    pub fn default_origin(&self) -> Coordinate {
        Coordinate::from(self.default_origin)
    }
}

fn default_radius_km() -> f64 { DEFAULT_SEARCH_RADIUS_KM }
fn default_fetch_radius_km() -> f64 { 500.0 }
// Leeds city centre
fn default_origin() -> [f64; 2] { [53.8008, -1.5491] }

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_recommend_limit")]
    pub limit: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            limit: default_recommend_limit(),
        }
    }
}

impl From<&RecommendSettings> for RecommendParams {
    fn from(value: &RecommendSettings) -> Self {
        Self {
            threshold: value.threshold,
            limit: value.limit,
        }
    }
}

fn default_threshold() -> f64 { 0.4 }
fn default_recommend_limit() -> usize { 10 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_audience")]
    pub audience: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            audience: default_audience(),
        }
    }
}

fn default_audience() -> Option<String> { Some("authenticated".to_string()) }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with RADAR_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., RADAR__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("RADAR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_well_known_env(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("RADAR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Map the backend's conventional variable names onto config keys
///
/// `SUPABASE_URL`, `SUPABASE_KEY`, `SUPABASE_JWT_SECRET`, `GOOGLE_MAPS_API_KEY`,
/// `REDIS_URL`, `LOG_LEVEL` and `LOG_FORMAT` override file values when set.
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("SUPABASE_URL", "store.url"),
        ("SUPABASE_KEY", "store.api_key"),
        ("SUPABASE_JWT_SECRET", "auth.jwt_secret"),
        ("GOOGLE_MAPS_API_KEY", "geocoding.api_key"),
        ("REDIS_URL", "cache.redis_url"),
        ("LOG_LEVEL", "logging.level"),
        ("LOG_FORMAT", "logging.format"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
