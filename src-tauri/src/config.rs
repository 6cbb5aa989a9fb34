//! Inference endpoint configuration.
//!
//! Values come from environment variables first, then the preferences
//! store, then built-in defaults.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::LeafScanError;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/predict";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

pub const ENDPOINT_KEY: &str = "inference_endpoint";
pub const TIMEOUT_KEY: &str = "inference_timeout_secs";
pub const RETRIES_KEY: &str = "inference_max_retries";

pub const ENDPOINT_ENV: &str = "LEAFSCAN_ENDPOINT";
pub const TIMEOUT_ENV: &str = "LEAFSCAN_TIMEOUT_SECS";
pub const RETRIES_ENV: &str = "LEAFSCAN_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl InferenceConfig {
    /// Resolve each field from `env`, then `store`, then the default.
    /// Unparseable numbers are logged and skipped.
    pub fn resolve<E, S>(env: E, store: S) -> Self
    where
        E: Fn(&str) -> Option<String>,
        S: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &str, store_key: &str| {
            non_blank(env(env_key)).or_else(|| non_blank(store(store_key)))
        };
        let defaults = Self::default();

        Self {
            endpoint: pick(ENDPOINT_ENV, ENDPOINT_KEY).unwrap_or(defaults.endpoint),
            timeout_secs: parse_or(pick(TIMEOUT_ENV, TIMEOUT_KEY), TIMEOUT_KEY, defaults.timeout_secs)
                .max(1),
            max_retries: parse_or(pick(RETRIES_ENV, RETRIES_KEY), RETRIES_KEY, defaults.max_retries),
        }
    }

    /// Stored values and defaults only, as shown in the settings form.
    pub fn from_store<S>(store: S) -> Self
    where
        S: Fn(&str) -> Option<String>,
    {
        Self::resolve(|_| None, store)
    }

    /// Store keys currently shadowed by a non-blank environment variable.
    pub fn env_overrides<E>(env: E) -> Vec<&'static str>
    where
        E: Fn(&str) -> Option<String>,
    {
        [
            (ENDPOINT_ENV, ENDPOINT_KEY),
            (TIMEOUT_ENV, TIMEOUT_KEY),
            (RETRIES_ENV, RETRIES_KEY),
        ]
        .into_iter()
        .filter(|(env_key, _)| non_blank(env(env_key)).is_some())
        .map(|(_, store_key)| store_key)
        .collect()
    }

    pub fn endpoint_url(&self) -> Result<Url, LeafScanError> {
        validate_endpoint(&self.endpoint)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {:?}", key, v);
            default
        }),
        None => default,
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_endpoint(endpoint: &str) -> Result<Url, LeafScanError> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| LeafScanError::Config(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LeafScanError::Config(format!(
            "Endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(LeafScanError::Config(format!("No host in endpoint URL: {}", endpoint)));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_defaults() {
        let config = InferenceConfig::resolve(lookup(&[]), lookup(&[]));
        assert_eq!(config, InferenceConfig::default());
    }

    #[test]
    fn test_resolve_store_values() {
        let store = lookup(&[
            (ENDPOINT_KEY, "https://api.example.com/v1/classify"),
            (TIMEOUT_KEY, "10"),
            (RETRIES_KEY, "0"),
        ]);
        let config = InferenceConfig::resolve(lookup(&[]), store);
        assert_eq!(config.endpoint, "https://api.example.com/v1/classify");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_env_overrides_store() {
        let env = lookup(&[(ENDPOINT_ENV, "http://localhost:9000/predict")]);
        let store = lookup(&[(ENDPOINT_KEY, "https://api.example.com/v1/classify")]);
        let config = InferenceConfig::resolve(env, store);
        assert_eq!(config.endpoint, "http://localhost:9000/predict");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let store = lookup(&[(TIMEOUT_KEY, "soon"), (RETRIES_KEY, "-1")]);
        let config = InferenceConfig::resolve(lookup(&[]), store);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_zero_timeout_raised_to_one() {
        let store = lookup(&[(TIMEOUT_KEY, "0")]);
        let config = InferenceConfig::resolve(lookup(&[]), store);
        assert_eq!(config.timeout_secs, 1);
    }

    #[test]
    fn test_blank_values_ignored() {
        let store = lookup(&[(ENDPOINT_KEY, "   ")]);
        let config = InferenceConfig::resolve(lookup(&[]), store);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_blank_env_falls_through_to_store() {
        let env = lookup(&[(ENDPOINT_ENV, ""), (TIMEOUT_ENV, "  ")]);
        let store = lookup(&[
            (ENDPOINT_KEY, "https://api.example.com/v1/classify"),
            (TIMEOUT_KEY, "12"),
        ]);
        let config = InferenceConfig::resolve(env, store);
        assert_eq!(config.endpoint, "https://api.example.com/v1/classify");
        assert_eq!(config.timeout_secs, 12);
    }

    #[test]
    fn test_from_store_ignores_environment() {
        let store = lookup(&[(ENDPOINT_KEY, "https://api.example.com/v1/classify")]);
        let config = InferenceConfig::from_store(store);
        assert_eq!(config.endpoint, "https://api.example.com/v1/classify");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_env_overrides_lists_set_variables() {
        let env = lookup(&[(ENDPOINT_ENV, "http://localhost:9000/predict"), (RETRIES_ENV, " ")]);
        assert_eq!(InferenceConfig::env_overrides(env), vec![ENDPOINT_KEY]);
        assert!(InferenceConfig::env_overrides(lookup(&[])).is_empty());
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("https://api.example.com/predict").is_ok());
        assert!(validate_endpoint("http://127.0.0.1:8000/predict").is_ok());
        assert!(validate_endpoint("ftp://example.com/predict").is_err());
        assert!(validate_endpoint("not a url").is_err());
        assert!(validate_endpoint("").is_err());
    }
}
