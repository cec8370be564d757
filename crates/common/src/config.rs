//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Community (matching, discovery) tuning.
    #[serde(default)]
    pub community: CommunityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`postgres://…` or `sqlite:…`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Tuning knobs for buddy suggestions and nearby discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct CommunityConfig {
    /// Size of the interest-similarity sample scored per suggestion request.
    #[serde(default = "default_suggestion_pool_size")]
    pub suggestion_pool_size: u64,
    /// Suggestions returned when the caller does not pass a limit.
    #[serde(default = "default_suggestion_limit")]
    pub default_suggestion_limit: usize,
    /// Upper bound on the suggestion limit a caller may request.
    #[serde(default = "default_max_suggestion_limit")]
    pub max_suggestion_limit: usize,
    /// Radius used by nearby listings when the caller gives none.
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    /// Largest radius a caller may request.
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,
    /// Upper bound on items returned by one nearby listing.
    #[serde(default = "default_max_nearby_results")]
    pub max_nearby_results: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            suggestion_pool_size: default_suggestion_pool_size(),
            default_suggestion_limit: default_suggestion_limit(),
            max_suggestion_limit: default_max_suggestion_limit(),
            default_radius_km: default_radius_km(),
            max_radius_km: default_max_radius_km(),
            max_nearby_results: default_max_nearby_results(),
        }
    }
}

impl CommunityConfig {
    /// Resolve a caller-supplied suggestion limit against the configured bounds.
    #[must_use]
    pub fn suggestion_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_suggestion_limit)
            .clamp(1, self.max_suggestion_limit.max(1))
    }

    /// Resolve a caller-supplied radius against the configured bounds.
    #[must_use]
    pub fn radius_km(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(r) if r.is_finite() && r > 0.0 => r.min(self.max_radius_km),
            _ => self.default_radius_km,
        }
    }

    /// Resolve a caller-supplied nearby listing limit.
    #[must_use]
    pub fn nearby_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.max_nearby_results)
            .clamp(1, self.max_nearby_results.max(1))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_suggestion_pool_size() -> u64 {
    50
}

const fn default_suggestion_limit() -> usize {
    20
}

const fn default_max_suggestion_limit() -> usize {
    100
}

const fn default_radius_km() -> f64 {
    25.0
}

const fn default_max_radius_km() -> f64 {
    500.0
}

const fn default_max_nearby_results() -> usize {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `TRIPMATE_ENV`)
    /// 3. Environment variables with `TRIPMATE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("TRIPMATE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TRIPMATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TRIPMATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_community_defaults() {
        let community = CommunityConfig::default();
        assert_eq!(community.suggestion_pool_size, 50);
        assert_eq!(community.default_suggestion_limit, 20);
        assert!((community.default_radius_km - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_suggestion_limit_bounds() {
        let community = CommunityConfig::default();
        assert_eq!(community.suggestion_limit(None), 20);
        assert_eq!(community.suggestion_limit(Some(0)), 1);
        assert_eq!(community.suggestion_limit(Some(5)), 5);
        assert_eq!(community.suggestion_limit(Some(10_000)), 100);
    }

    #[test]
    fn test_radius_bounds() {
        let community = CommunityConfig::default();
        assert!((community.radius_km(None) - 25.0).abs() < f64::EPSILON);
        assert!((community.radius_km(Some(-3.0)) - 25.0).abs() < f64::EPSILON);
        assert!((community.radius_km(Some(f64::NAN)) - 25.0).abs() < f64::EPSILON);
        assert!((community.radius_km(Some(10.0)) - 10.0).abs() < f64::EPSILON);
        assert!((community.radius_km(Some(9_000.0)) - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nearby_limit_bounds() {
        let community = CommunityConfig::default();
        assert_eq!(community.nearby_limit(None), 100);
        assert_eq!(community.nearby_limit(Some(7)), 7);
        assert_eq!(community.nearby_limit(Some(1_000)), 100);
    }

    #[test]
    fn test_zero_maximums_do_not_panic() {
        let community = CommunityConfig {
            max_suggestion_limit: 0,
            max_nearby_results: 0,
            ..CommunityConfig::default()
        };
        assert_eq!(community.suggestion_limit(None), 1);
        assert_eq!(community.suggestion_limit(Some(50)), 1);
        assert_eq!(community.nearby_limit(None), 1);
        assert_eq!(community.nearby_limit(Some(0)), 1);
    }

    #[test]
    fn test_deserialize_without_community_section() {
        let raw = r#"{
            "server": { "url": "https://trip.example" },
            "database": { "url": "sqlite::memory:" }
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.community.max_suggestion_limit, 100);
    }
}
