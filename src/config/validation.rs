use crate::config::types::{
    Config, MiningConfig, OcrConfig, ProxyConfig, RateLimitConfig, SitemapConfig, UserAgentConfig,
    MIN_RATE_RPS,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Proxy protocols the HTTP client can route through
const SUPPORTED_PROXY_PROTOCOLS: &[&str] = &["http", "https", "socks5"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_rate_limits(&config.rate_limit)?;
    validate_proxies(&config.proxy)?;
    validate_mining(&config.layers3d)?;
    validate_ocr(&config.ocr)?;
    validate_sitemap(&config.sitemap)?;

    if config.crawler.service_id.is_empty() {
        return Err(ConfigError::Validation(
            "service_id cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The name doubles as the robots.txt product token: alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates rate budgets. Zero means "no limit"; negative rates are rejected.
fn validate_rate_limits(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if let Some(rps) = config.default_rps {
        validate_rate("default_rps", rps)?;
    }

    for entry in &config.hosts {
        if entry.host.is_empty() {
            return Err(ConfigError::Validation(
                "rate limit host cannot be empty".to_string(),
            ));
        }
        validate_rate(&entry.host, entry.rps)?;
    }

    Ok(())
}

fn validate_rate(label: &str, rps: f64) -> Result<(), ConfigError> {
    if !rps.is_finite() || rps < 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate for {} must be a non-negative number, got {}",
            label, rps
        )));
    }
    if rps > 0.0 && rps < MIN_RATE_RPS {
        return Err(ConfigError::Validation(format!(
            "rate for {} must be 0 (unlimited) or at least {}, got {}",
            label, MIN_RATE_RPS, rps
        )));
    }
    Ok(())
}

/// Validates proxy declarations
fn validate_proxies(config: &ProxyConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in &config.servers {
        if entry.id.is_empty() {
            return Err(ConfigError::Validation("proxy id cannot be empty".to_string()));
        }

        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate proxy id '{}'",
                entry.id
            )));
        }

        if entry.host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' has an empty host",
                entry.id
            )));
        }

        if entry.port == 0 {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' must have a non-zero port",
                entry.id
            )));
        }

        if !SUPPORTED_PROXY_PROTOCOLS.contains(&entry.protocol.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' uses unsupported protocol '{}'",
                entry.id, entry.protocol
            )));
        }
    }

    Ok(())
}

fn validate_mining(config: &MiningConfig) -> Result<(), ConfigError> {
    if config.enabled {
        validate_endpoint("layers3d", config.endpoint.as_deref())?;
    }

    if !(0.0..=1.0).contains(&config.min_importance) {
        return Err(ConfigError::Validation(format!(
            "min_importance must be between 0 and 1, got {}",
            config.min_importance
        )));
    }

    Ok(())
}

fn validate_ocr(config: &OcrConfig) -> Result<(), ConfigError> {
    if config.enabled {
        validate_endpoint("ocr", config.endpoint.as_deref())?;
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "ocr batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if !(0.0..=1.0).contains(&config.compression_ratio) {
        return Err(ConfigError::Validation(format!(
            "ocr compression_ratio must be between 0 and 1, got {}",
            config.compression_ratio
        )));
    }

    if !(0.0..=1.0).contains(&config.min_precision) {
        return Err(ConfigError::Validation(format!(
            "ocr min_precision must be between 0 and 1, got {}",
            config.min_precision
        )));
    }

    Ok(())
}

fn validate_sitemap(config: &SitemapConfig) -> Result<(), ConfigError> {
    if config.max_nodes < 1 {
        return Err(ConfigError::Validation(
            "sitemap max_nodes must be >= 1".to_string(),
        ));
    }

    if !(config.success_decay > 0.0 && config.success_decay < 1.0) {
        return Err(ConfigError::Validation(format!(
            "sitemap success_decay must be in (0, 1), got {}",
            config.success_decay
        )));
    }

    Ok(())
}

/// An enabled engine needs an absolute HTTP(S) endpoint
fn validate_endpoint(section: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    let endpoint = endpoint.ok_or_else(|| {
        ConfigError::Validation(format!("{} is enabled but has no endpoint", section))
    })?;

    let url = Url::parse(endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid {} endpoint '{}': {}", section, endpoint, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} endpoint must use http or https, got '{}'",
            section, endpoint
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
