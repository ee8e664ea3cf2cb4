use super::transport_error;
use crate::config::MiningConfig;
use crate::crawler::{build_http_client, ConnectionConfig};
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const ENGINE: &str = "3d-layers";

/// Structural model of a page as produced by the mining engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningReport {
    #[serde(default)]
    pub structural_model: serde_json::Value,

    /// Structured-data schemas found on the page
    #[serde(default)]
    pub schemas: Vec<serde_json::Value>,

    #[serde(default)]
    pub metadata: MiningMetadata,

    #[serde(default)]
    pub training_data: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningMetadata {
    #[serde(default)]
    pub seo_score: f64,

    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Structural mining engine
#[async_trait]
pub trait MiningEngine: Send + Sync {
    /// Called once at startup; an error leaves the engine unused
    async fn initialize(&self) -> Result<(), CrawlError> {
        Ok(())
    }

    /// Mines `url`, reaching it through `connection`
    async fn mine_url(
        &self,
        url: &Url,
        connection: &ConnectionConfig,
    ) -> Result<MiningReport, CrawlError>;

    async fn shutdown(&self) {}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MineRequest<'a> {
    url: &'a str,
    max_depth: u32,
    min_importance: f64,
    user_agent: &'a str,
    proxy: Option<String>,
}

/// Mining engine reached over HTTP
///
/// Each call POSTs the target URL with the connection profile; the service
/// performs the fetch itself through the given proxy.
pub struct HttpMiningEngine {
    client: Client,
    endpoint: Url,
    max_depth: u32,
    min_importance: f64,
}

impl HttpMiningEngine {
    pub fn new(client: Client, endpoint: Url, max_depth: u32, min_importance: f64) -> Self {
        Self {
            client,
            endpoint,
            max_depth,
            min_importance,
        }
    }

    pub fn from_config(config: &MiningConfig, user_agent: &str) -> Result<Self, CrawlError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            ConfigError::Validation("layers3d.endpoint is required when enabled".to_string())
        })?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("layers3d.endpoint: {}", e)))?;

        let client = build_http_client(
            &ConnectionConfig::direct(user_agent),
            Duration::from_millis(config.timeout_ms),
        )?;

        Ok(Self::new(
            client,
            endpoint,
            config.max_depth,
            config.min_importance,
        ))
    }
}

#[async_trait]
impl MiningEngine for HttpMiningEngine {
    /// Probes the endpoint; any HTTP response counts as reachable
    async fn initialize(&self) -> Result<(), CrawlError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| transport_error(ENGINE, &self.endpoint, e))?;

        tracing::info!(
            endpoint = %self.endpoint,
            status = response.status().as_u16(),
            "Mining engine reachable"
        );
        Ok(())
    }

    async fn mine_url(
        &self,
        url: &Url,
        connection: &ConnectionConfig,
    ) -> Result<MiningReport, CrawlError> {
        let body = MineRequest {
            url: url.as_str(),
            max_depth: self.max_depth,
            min_importance: self.min_importance,
            user_agent: &connection.user_agent,
            proxy: connection.proxy_url(),
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
            .json::<MiningReport>()
            .await
            .map_err(|e| CrawlError::Engine {
                engine: ENGINE,
                message: format!("invalid response: {}", e),
            })
    }

    async fn shutdown(&self) {
        tracing::debug!(endpoint = %self.endpoint, "Mining engine released");
    }
}
