//! Request and result types for orchestrated crawls

use crate::engines::{MiningReport, OcrSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A single crawl to orchestrate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: Url,
    #[serde(default)]
    pub options: CrawlOptions,
}

impl CrawlRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            options: CrawlOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CrawlOptions) -> Self {
        self.options = options;
        self
    }
}

/// Which engines a crawl asks for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOptions {
    /// Run structural mining on the target URL
    #[serde(default)]
    pub mine_structure: bool,

    /// Run OCR over `images`
    #[serde(default)]
    pub extract_images: bool,

    #[serde(default)]
    pub images: Vec<Url>,
}

/// The component an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Structural mining (3D layers) engine
    #[serde(rename = "3d-layers")]
    Mining,
    Ocr,
    /// The orchestrator itself (robots, rate limiting, unexpected failures)
    Crawler,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Mining => "3d-layers",
            Service::Ocr => "ocr",
            Service::Crawler => "crawler",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error attributed to one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    pub service: Service,
    pub error: String,
}

impl ServiceError {
    pub fn new(service: Service, error: impl Into<String>) -> Self {
        Self {
            service,
            error: error.into(),
        }
    }
}

/// Engine outputs gathered during a crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_mining: Option<MiningReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrSummary>,
}

/// Bookkeeping attached to every crawl result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlMetadata {
    /// Proxy the crawl was routed through, if any
    pub proxy_id: Option<String>,

    pub user_agent: Option<String>,

    /// Wall time from the robots check to the end of engine aggregation
    pub duration_ms: u64,

    /// Set only when mining was attempted
    #[serde(rename = "has3DLayers", default, skip_serializing_if = "Option::is_none")]
    pub has_3d_layers: Option<bool>,

    /// Set only when OCR was attempted
    #[serde(rename = "hasOCR", default, skip_serializing_if = "Option::is_none")]
    pub has_ocr: Option<bool>,
}

/// Aggregated outcome of one orchestrated crawl
///
/// A result is produced for every request, successful or not. `success`
/// only reports whether the pipeline itself got through (robots, rate
/// limiting, proxy selection); engine failures land in `errors` and leave
/// `success` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub url: Url,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub data: CrawlData,
    pub metadata: CrawlMetadata,
    pub errors: Vec<ServiceError>,
}

impl CrawlResult {
    /// An empty, not-yet-successful result for `url`
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timestamp: Utc::now(),
            success: false,
            data: CrawlData::default(),
            metadata: CrawlMetadata::default(),
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, service: Service, error: impl Into<String>) {
        self.errors.push(ServiceError::new(service, error));
    }

    /// Errors attributed to `service`
    pub fn errors_for(&self, service: Service) -> impl Iterator<Item = &ServiceError> {
        self.errors.iter().filter(move |e| e.service == service)
    }
}
