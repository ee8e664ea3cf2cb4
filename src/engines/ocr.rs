use super::transport_error;
use crate::config::OcrConfig;
use crate::crawler::{build_http_client, BatchOutcome, BatchSummary, ConnectionConfig};
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const ENGINE: &str = "ocr";

/// Recognized text for one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrText {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub model: Option<String>,
}

/// OCR engine
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognizes the text in the image at `image`
    async fn recognize(&self, image: &Url) -> Result<OcrText, CrawlError>;
}

/// `fileUrl` repeats `imageUrl` for workers that read that field instead
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OcrRequest<'a> {
    image_url: &'a str,
    file_url: &'a str,
    compression_ratio: f64,
    min_precision: f64,
}

/// OCR engine reached over HTTP
pub struct HttpOcrEngine {
    client: Client,
    endpoint: Url,
    compression_ratio: f64,
    min_precision: f64,
}

impl HttpOcrEngine {
    pub fn new(client: Client, endpoint: Url, compression_ratio: f64, min_precision: f64) -> Self {
        Self {
            client,
            endpoint,
            compression_ratio,
            min_precision,
        }
    }

    pub fn from_config(config: &OcrConfig, user_agent: &str) -> Result<Self, CrawlError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            ConfigError::Validation("ocr.endpoint is required when enabled".to_string())
        })?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("ocr.endpoint: {}", e)))?;

        let client = build_http_client(
            &ConnectionConfig::direct(user_agent),
            Duration::from_millis(config.timeout_ms),
        )?;

        Ok(Self::new(
            client,
            endpoint,
            config.compression_ratio,
            config.min_precision,
        ))
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    async fn recognize(&self, image: &Url) -> Result<OcrText, CrawlError> {
        let body = OcrRequest {
            image_url: image.as_str(),
            file_url: image.as_str(),
            compression_ratio: self.compression_ratio,
            min_precision: self.min_precision,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ENGINE, &self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<OcrText>()
            .await
            .map_err(|e| CrawlError::Engine {
                engine: ENGINE,
                message: format!("invalid response: {}", e),
            })
    }
}

/// Per-image line of an [`OcrSummary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrItemReport {
    pub image_url: Url,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of an OCR batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrSummary {
    /// Texts of the successful items, newline-joined in input order
    pub text: String,
    pub success_rate: f64,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<OcrItemReport>,
}

impl OcrSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome<Url, OcrText>]) -> Self {
        let counts = BatchSummary::from_outcomes(outcomes);

        let items: Vec<OcrItemReport> = outcomes
            .iter()
            .map(|outcome| match outcome {
                BatchOutcome::Completed { input, output } => OcrItemReport {
                    image_url: input.clone(),
                    text: Some(output.text.clone()),
                    error: None,
                },
                BatchOutcome::Failed {
                    error,
                    original_input,
                } => OcrItemReport {
                    image_url: original_input.clone(),
                    text: None,
                    error: Some(error.clone()),
                },
            })
            .collect();

        let text = items
            .iter()
            .filter_map(|item| item.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            text,
            success_rate: counts.success_rate(),
            total: counts.total,
            successful: counts.successful,
            failed: counts.failed,
            items,
        }
    }

    /// True when there was at least one image and none were recognized
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.successful == 0
    }

    /// The first per-item error, if any
    pub fn first_error(&self) -> Option<&str> {
        self.items.iter().find_map(|item| item.error.as_deref())
    }
}
