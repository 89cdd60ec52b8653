//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_SEARCH_API_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Base URL of the hosted store and identity provider.
    pub supabase_url: String,
    /// Public (anon) key sent with every store and identity call.
    pub supabase_anon_key: String,
    pub search_api_url: String,
    pub search_result_limit: u32,
    pub search_debounce: Duration,
    pub record_search_history: bool,
    pub federated_provider: String,
    pub federated_redirect_url: Option<String>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Hosted Backend (required) ---
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_string();
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        // --- Paper Search ---
        let search_api_url = var_or("SEARCH_API_URL", DEFAULT_SEARCH_API_URL);

        let limit_str = var_or("SEARCH_RESULT_LIMIT", "10");
        let search_result_limit = limit_str.parse::<u32>().map_err(|e| {
            ConfigError::InvalidValue("SEARCH_RESULT_LIMIT".to_string(), e.to_string())
        })?;

        let debounce_str = var_or("SEARCH_DEBOUNCE_MS", "500");
        let search_debounce = debounce_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| {
                ConfigError::InvalidValue("SEARCH_DEBOUNCE_MS".to_string(), e.to_string())
            })?;

        let record_str = var_or("RECORD_SEARCH_HISTORY", "false");
        let record_search_history = record_str.parse::<bool>().map_err(|_| {
            ConfigError::InvalidValue(
                "RECORD_SEARCH_HISTORY".to_string(),
                format!("'{}' is not true or false", record_str),
            )
        })?;

        // --- Federated Sign-in & Browser Origin ---
        let federated_provider = var_or("FEDERATED_PROVIDER", "google");
        let federated_redirect_url = lookup("FEDERATED_REDIRECT_URL");
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            log_level,
            supabase_url,
            supabase_anon_key,
            search_api_url,
            search_result_limit,
            search_debounce,
            record_search_history,
            federated_provider,
            federated_redirect_url,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.search_api_url, DEFAULT_SEARCH_API_URL);
        assert_eq!(config.search_result_limit, 10);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert!(!config.record_search_history);
        assert_eq!(config.federated_provider, "google");
        assert_eq!(config.bind_address.port(), 3000);
    }

    #[rstest]
    #[case("SUPABASE_URL")]
    #[case("SUPABASE_ANON_KEY")]
    fn missing_backend_settings_are_fatal(#[case] missing: &str) {
        let present: Vec<(&str, &str)> =
            REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();

        let err = Config::from_lookup(lookup_from(&present)).unwrap_err();

        assert!(matches!(err, ConfigError::MissingVar(ref var) if var == missing));
    }

    #[rstest]
    #[case("SEARCH_DEBOUNCE_MS", "soon")]
    #[case("SEARCH_RESULT_LIMIT", "-1")]
    #[case("RECORD_SEARCH_HISTORY", "yes")]
    #[case("BIND_ADDRESS", "localhost")]
    fn malformed_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((key, value));

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == key));
    }
}
