use serde::Serialize;
use tauri::State;
use tracing::info;

use super::config::load_inference_config;
use super::keychain::read_api_token;
use crate::diagnosis::{DiseaseCatalog, InferenceClient};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub endpoint: String,
    pub endpoint_valid: bool,
    pub endpoint_reachable: bool,
    pub api_token_set: bool,
    pub catalog_size: usize,
}

#[tauri::command]
pub async fn run_health_check(
    app: tauri::AppHandle,
    catalog: State<'_, DiseaseCatalog>,
) -> Result<HealthReport, String> {
    info!("Running health check");

    let config = load_inference_config(&app).map_err(|e| e.to_string())?;
    let token = read_api_token();
    let api_token_set = token.is_some();

    let (endpoint_valid, endpoint_reachable) = match InferenceClient::new(&config, token) {
        Ok(client) => (true, client.probe().await),
        Err(e) => {
            info!("Endpoint is not usable: {}", e);
            (false, false)
        }
    };
    info!(
        "Endpoint {} valid: {}, reachable: {}, API token set: {}",
        config.endpoint, endpoint_valid, endpoint_reachable, api_token_set
    );

    Ok(HealthReport {
        endpoint: config.endpoint,
        endpoint_valid,
        endpoint_reachable,
        api_token_set,
        catalog_size: catalog.len(),
    })
}
