//! Tauri command for leaf photo analysis.
//!
//! `analyze_leaf` runs the whole pipeline:
//! 1. Decodes the base64 upload and prepares a 512px JPEG
//! 2. Sends it to the configured inference endpoint
//! 3. Describes the returned label from the disease catalog

use base64::{engine::general_purpose::STANDARD, Engine};
use tauri::State;
use tracing::{error, info};

use super::config::load_inference_config;
use super::keychain::read_api_token;
use crate::diagnosis::{prepare_image, AnalyzeRequest, Diagnosis, DiseaseCatalog, InferenceClient};
use crate::error::LeafScanError;

/// Analyze a leaf photo and return the diagnosis.
///
/// Errors are reduced to one of the four canned user messages; the full
/// cause is logged.
#[tauri::command]
pub async fn analyze_leaf(
    app: tauri::AppHandle,
    catalog: State<'_, DiseaseCatalog>,
    request: AnalyzeRequest,
) -> Result<Diagnosis, String> {
    run_analysis(&app, &catalog, request).await.map_err(|e| {
        error!("Leaf analysis failed: {}", e);
        e.into()
    })
}

async fn run_analysis(
    app: &tauri::AppHandle,
    catalog: &DiseaseCatalog,
    request: AnalyzeRequest,
) -> Result<Diagnosis, LeafScanError> {
    info!(
        "Starting leaf analysis for {} ({})",
        request.file_name.as_deref().unwrap_or("<unnamed>"),
        request.mime_type
    );

    let image_bytes = decode_upload(&request.image_base64)?;

    // Decoding and resizing is CPU-bound
    let mime_type = request.mime_type.clone();
    let prepared = tauri::async_runtime::spawn_blocking(move || prepare_image(&image_bytes, &mime_type))
        .await
        .map_err(|e| LeafScanError::Encode(format!("Image preparation task failed: {}", e)))??;

    let config = load_inference_config(app)?;
    let client = InferenceClient::new(&config, read_api_token())?;
    let prediction = client.classify(&prepared.jpeg).await?;

    let diagnosis = Diagnosis::from_prediction(prediction, catalog)?;
    info!(
        "Analysis complete: {} ({:.0}%)",
        diagnosis.display_name,
        diagnosis.confidence * 100.0
    );
    Ok(diagnosis)
}

/// Accepts plain base64 or a `data:<mime>;base64,` URL.
fn decode_upload(encoded: &str) -> Result<Vec<u8>, LeafScanError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| LeafScanError::Decode(format!("Invalid base64 image data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_upload_plain() {
        assert_eq!(decode_upload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_upload_data_url() {
        assert_eq!(
            decode_upload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_decode_upload_invalid() {
        assert!(matches!(
            decode_upload("%%%"),
            Err(LeafScanError::Decode(_))
        ));
    }
}
