use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Wry};
use tauri_plugin_store::{Store, StoreExt};
use tracing::{info, warn};

use crate::config::{validate_endpoint, InferenceConfig, ENDPOINT_KEY, RETRIES_KEY, TIMEOUT_KEY};
use crate::error::LeafScanError;

const STORE_FILE: &str = "preferences.json";

/// Read a string preference, accepting numbers stored by older versions.
fn read_store_value(app: &AppHandle, key: &str) -> Result<Option<String>, String> {
    let store = app.store(STORE_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    Ok(store.get(key).and_then(as_plain_string))
}

fn as_plain_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn write_store_values(app: &AppHandle, values: &[(&str, String)]) -> Result<(), String> {
    let store = app.store(STORE_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    for (key, value) in values {
        store.set(*key, serde_json::json!(value));
    }
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}

/// Stored inference settings plus the store keys the environment overrides.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceSettings {
    #[serde(flatten)]
    pub config: InferenceConfig,
    pub env_overrides: Vec<&'static str>,
}

fn open_store(app: &AppHandle) -> Result<Arc<Store<Wry>>, LeafScanError> {
    app.store(STORE_FILE)
        .map_err(|e| LeafScanError::Config(format!("Failed to open preferences: {}", e)))
}

/// Current inference config with environment overrides applied.
pub(crate) fn load_inference_config(app: &AppHandle) -> Result<InferenceConfig, LeafScanError> {
    let store = open_store(app)?;
    Ok(InferenceConfig::resolve(
        |key| std::env::var(key).ok(),
        |key| store.get(key).and_then(as_plain_string),
    ))
}

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    read_store_value(&app, key)
}

#[tauri::command]
pub fn set_preference(app: AppHandle, key: &str, value: &str) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    write_store_values(&app, &[(key, value.to_string())])
}

/// Settings as saved, without environment values, so saving the form
/// never persists an override.
#[tauri::command]
pub fn get_inference_config(app: AppHandle) -> Result<InferenceSettings, String> {
    let store = open_store(&app).map_err(|e| e.to_string())?;
    Ok(InferenceSettings {
        config: InferenceConfig::from_store(|key| store.get(key).and_then(as_plain_string)),
        env_overrides: InferenceConfig::env_overrides(|key| std::env::var(key).ok()),
    })
}

/// Validate and persist the inference settings.
///
/// Unlike analysis errors, validation details are returned as-is so the
/// settings form can show what is wrong.
#[tauri::command]
pub fn set_inference_config(app: AppHandle, config: InferenceConfig) -> Result<(), String> {
    let endpoint = validate_endpoint(&config.endpoint).map_err(|e| e.to_string())?;
    if config.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".to_string());
    }
    info!(
        "Saving inference config: {} (timeout {}s, {} retries)",
        endpoint, config.timeout_secs, config.max_retries
    );
    write_store_values(
        &app,
        &[
            (ENDPOINT_KEY, endpoint.to_string()),
            (TIMEOUT_KEY, config.timeout_secs.to_string()),
            (RETRIES_KEY, config.max_retries.to_string()),
        ],
    )
}
