//! Request and result types for leaf diagnosis.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::catalog::DiseaseCatalog;
use crate::error::LeafScanError;

/// Payload sent by the analyzer widget.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64-encoded original file bytes
    pub image_base64: String,
    /// MIME type reported by the browser for the selected file
    pub mime_type: String,
    /// Original file name, only used for logging
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Body returned by the inference endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPrediction {
    pub disease: String,
    pub confidence: f64,
}

/// What the UI renders after a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Class label as returned by the endpoint
    pub disease: String,
    /// Human-friendly "Plant: Condition" name
    pub display_name: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub description: String,
    pub healthy: bool,
    /// RFC 3339 timestamp
    pub analyzed_at: String,
}

impl Diagnosis {
    pub fn from_prediction(
        prediction: RawPrediction,
        catalog: &DiseaseCatalog,
    ) -> Result<Self, LeafScanError> {
        let confidence = normalize_confidence(prediction.confidence)?;
        let disease = prediction.disease.trim().to_string();

        Ok(Diagnosis {
            display_name: catalog.display_name(&disease),
            description: catalog.describe(&disease),
            healthy: catalog.is_healthy(&disease),
            confidence,
            disease,
            analyzed_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Bring a confidence score into [0, 1].
///
/// Some endpoints report percentages, so values in (1, 100] are divided by 100.
pub fn normalize_confidence(raw: f64) -> Result<f64, LeafScanError> {
    if !raw.is_finite() {
        return Err(LeafScanError::InvalidResponse(format!(
            "confidence is not a finite number: {}",
            raw
        )));
    }
    let value = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    Ok(value.clamp(0.0, 1.0))
}
