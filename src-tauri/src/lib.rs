pub mod commands;
pub mod config;
pub mod diagnosis;
pub mod error;

pub use diagnosis::{Diagnosis, DiseaseCatalog};
pub use error::LeafScanError;

use anyhow::Context;
use tauri::Manager;

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::analyze::analyze_leaf,
            commands::catalog::list_diseases,
            commands::config::get_preference,
            commands::config::set_preference,
            commands::config::get_inference_config,
            commands::config::set_inference_config,
            commands::keychain::set_api_token,
            commands::keychain::has_api_token,
            commands::keychain::delete_api_token,
            commands::health::run_health_check,
        ])
        .setup(|app| {
            init_state(app.handle())?;
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

fn init_state(app: &tauri::AppHandle) -> anyhow::Result<()> {
    let catalog = DiseaseCatalog::builtin().context("Failed to load built-in disease catalog")?;
    tracing::info!("Loaded disease catalog with {} entries", catalog.len());
    app.manage(catalog);

    match commands::config::load_inference_config(app) {
        Ok(config) => tracing::info!("Inference endpoint: {}", config.endpoint),
        Err(e) => tracing::warn!("Could not read inference config at startup: {}", e),
    }
    Ok(())
}
