//! HTTP client construction
//!
//! Every outbound client (robots fetches, sitemap fetches, engine calls)
//! identifies itself with the configured user agent and carries an explicit
//! request timeout.

use crate::proxy::ProxyRecord;
use reqwest::{Client, Proxy};
use serde::Serialize;
use std::time::Duration;

/// How a crawl reaches its target: the identity it presents and the proxy it
/// is routed through
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub user_agent: String,
    pub proxy: Option<ProxyRecord>,
}

impl ConnectionConfig {
    pub fn direct(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            proxy: None,
        }
    }

    /// The proxy URL, e.g. `socks5://10.0.0.1:1080`
    pub fn proxy_url(&self) -> Option<String> {
        self.proxy.as_ref().map(ProxyRecord::url)
    }
}

/// Builds an HTTP client for one connection profile
///
/// # Arguments
///
/// * `connection` - User agent and optional proxy
/// * `timeout` - Total request timeout
pub fn build_http_client(
    connection: &ConnectionConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(connection.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = connection.proxy_url() {
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    builder.build()
}
