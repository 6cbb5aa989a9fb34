use thiserror::Error;

/// Shown for local validation failures and 400/415/422 responses.
pub const INVALID_IMAGE: &str =
    "We couldn't read that image. Please upload a clear JPEG, PNG, or WebP photo of a single leaf.";

/// Shown for oversized uploads and 413 responses.
pub const TOO_LARGE: &str = "That image is too large. Please upload a photo smaller than 10MB.";

/// Shown for 429 responses.
pub const RATE_LIMITED: &str = "Too many requests right now. Please wait a moment and try again.";

/// Shown for everything else: other statuses, transport errors, bad payloads.
pub const SERVICE_UNAVAILABLE: &str =
    "The analysis service is unavailable right now. Please try again later.";

#[derive(Debug, Error)]
pub enum LeafScanError {
    #[error("Image is empty")]
    EmptyImage,

    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Request to inference endpoint failed: {0}")]
    Network(String),

    #[error("Inference endpoint timed out after {0}s")]
    Timeout(u64),

    #[error("Inference endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Invalid response from inference endpoint: {0}")]
    InvalidResponse(String),
}

impl LeafScanError {
    /// The canned message the UI is allowed to see for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            LeafScanError::EmptyImage
            | LeafScanError::UnsupportedType(_)
            | LeafScanError::Decode(_) => INVALID_IMAGE,
            LeafScanError::TooLarge { .. } => TOO_LARGE,
            LeafScanError::Endpoint { status, .. } => message_for_status(*status),
            LeafScanError::Encode(_)
            | LeafScanError::Config(_)
            | LeafScanError::Network(_)
            | LeafScanError::Timeout(_)
            | LeafScanError::InvalidResponse(_) => SERVICE_UNAVAILABLE,
        }
    }

    /// Whether another attempt against the endpoint could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LeafScanError::Network(_) | LeafScanError::Timeout(_) => true,
            LeafScanError::Endpoint { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Map an HTTP status from the inference endpoint to its canned message.
pub fn message_for_status(status: u16) -> &'static str {
    match status {
        400 | 415 | 422 => INVALID_IMAGE,
        413 => TOO_LARGE,
        429 => RATE_LIMITED,
        _ => SERVICE_UNAVAILABLE,
    }
}

impl From<LeafScanError> for String {
    fn from(err: LeafScanError) -> Self {
        err.user_message().to_string()
    }
}
