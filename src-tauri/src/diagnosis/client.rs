use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::multipart::{Form, Part};
use tracing::{error, info, warn};
use url::Url;

use super::types::RawPrediction;
use crate::config::InferenceConfig;
use crate::error::LeafScanError;

const USER_AGENT: &str = "LeafScan/0.1";
const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILE_NAME: &str = "leaf.jpg";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// Exponential backoff with full jitter between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Upper bound of the delay before retry number `attempt` (0-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}

/// Multipart client for the remote leaf classifier.
pub struct InferenceClient {
    client: reqwest::Client,
    endpoint: Url,
    api_token: Option<String>,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig, api_token: Option<String>) -> Result<Self, LeafScanError> {
        let endpoint = config.endpoint_url()?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeafScanError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            timeout_secs: config.timeout_secs,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upload a prepared JPEG and return the endpoint's prediction.
    ///
    /// Connection failures, timeouts, 429 and 5xx responses are retried
    /// up to `max_retries` times; anything else fails immediately.
    pub async fn classify(&self, jpeg: &[u8]) -> Result<RawPrediction, LeafScanError> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            match self.send_once(jpeg).await {
                Ok(prediction) => {
                    info!(
                        "Endpoint classified leaf as '{}' ({:.3}) in {:?} on attempt {}",
                        prediction.disease,
                        prediction.confidence,
                        started.elapsed(),
                        attempt + 1
                    );
                    return Ok(prediction);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Attempt {} against {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        self.endpoint,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Classification failed after {} attempt(s): {}", attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, jpeg: &[u8]) -> Result<RawPrediction, LeafScanError> {
        let part = Part::bytes(jpeg.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("image/jpeg")
            .map_err(|e| LeafScanError::Network(format!("Failed to build upload: {}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let mut request = self.client.post(self.endpoint.clone()).multipart(form);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = self.read_error_body(response).await?;
            return Err(LeafScanError::Endpoint {
                status: status.as_u16(),
                body: truncate(&body, 1024),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        parse_prediction(&body)
    }

    /// Read at most `MAX_ERROR_BODY_BYTES` of an error response.
    async fn read_error_body(&self, mut response: reqwest::Response) -> Result<String, LeafScanError> {
        let mut body = Vec::new();
        while body.len() < MAX_ERROR_BODY_BYTES {
            match response.chunk().await.map_err(|e| self.transport_error(e))? {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }
        body.truncate(MAX_ERROR_BODY_BYTES);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// True if anything answers HTTP at the endpoint, whatever the status.
    pub async fn probe(&self) -> bool {
        match self
            .client
            .get(self.endpoint.clone())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                info!("Endpoint probe returned {}", response.status());
                true
            }
            Err(e) => {
                warn!("Endpoint probe failed: {}", e);
                false
            }
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> LeafScanError {
        if e.is_timeout() {
            LeafScanError::Timeout(self.timeout_secs)
        } else {
            LeafScanError::Network(e.to_string())
        }
    }
}

/// Parse `{"disease": string, "confidence": number}`; extra fields are ignored.
pub fn parse_prediction(body: &str) -> Result<RawPrediction, LeafScanError> {
    let prediction: RawPrediction = serde_json::from_str(body).map_err(|e| {
        LeafScanError::InvalidResponse(format!("{} in body: {}", e, truncate(body, 200)))
    })?;
    if prediction.disease.trim().is_empty() {
        return Err(LeafScanError::InvalidResponse("empty disease label".to_string()));
    }
    Ok(prediction)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prediction_ok() {
        let body = r#"{"disease": "Tomato___Early_blight", "confidence": 0.82, "model": "v3"}"#;
        let prediction = parse_prediction(body).unwrap();
        assert_eq!(prediction.disease, "Tomato___Early_blight");
        assert_eq!(prediction.confidence, 0.82);
    }

    #[test]
    fn test_parse_prediction_integer_confidence() {
        let prediction = parse_prediction(r#"{"disease": "x", "confidence": 97}"#).unwrap();
        assert_eq!(prediction.confidence, 97.0);
    }

    #[test]
    fn test_parse_prediction_missing_fields() {
        assert!(matches!(
            parse_prediction(r#"{"disease": "x"}"#),
            Err(LeafScanError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_prediction(r#"{"confidence": 0.4}"#),
            Err(LeafScanError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_prediction(r#"{"disease": "x", "confidence": "high"}"#),
            Err(LeafScanError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_prediction_rejects_blank_label() {
        assert!(parse_prediction(r#"{"disease": "  ", "confidence": 0.4}"#).is_err());
    }

    #[test]
    fn test_parse_prediction_not_json() {
        let err = parse_prediction("<html>Bad Gateway</html>").unwrap_err();
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_backoff_ceiling_doubles_and_caps() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.backoff_ceiling(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_ceiling(40), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_within_ceiling() {
        let policy = RetryPolicy::new(3);
        for attempt in 0..4 {
            let delay = policy.delay_for(attempt);
            assert!(delay <= policy.backoff_ceiling(attempt));
        }
    }

    #[test]
    fn test_new_rejects_bad_endpoint() {
        let config = InferenceConfig {
            endpoint: "file:///tmp/model".to_string(),
            ..InferenceConfig::default()
        };
        assert!(matches!(
            InferenceClient::new(&config, None),
            Err(LeafScanError::Config(_))
        ));
    }

    #[test]
    fn test_blank_token_dropped() {
        let client = InferenceClient::new(&InferenceConfig::default(), Some("  ".into())).unwrap();
        assert!(client.api_token.is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
