use tauri::State;
use tracing::info;

use crate::diagnosis::{DiseaseCatalog, PlantGroup};

/// Supported diseases grouped by plant, for the landing and catalog pages.
#[tauri::command]
pub fn list_diseases(catalog: State<'_, DiseaseCatalog>) -> Vec<PlantGroup> {
    info!("Listing {} catalog entries", catalog.len());
    catalog.grouped_by_plant()
}
