use serde::Deserialize;

/// Main configuration structure for LightCrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub layers3d: MiningConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Orchestrator-wide settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Identifier stamped on every seed URL produced by this instance
    #[serde(default = "default_service_id")]
    pub service_id: String,

    /// Timeout applied to outbound requests without a more specific setting (milliseconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            service_id: default_service_id(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler (also the robots.txt product token)
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Robots.txt policy gateway settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RobotsConfig {
    /// How long a fetched robots.txt stays valid (seconds)
    #[serde(default = "default_robots_ttl")]
    pub cache_ttl_secs: u64,

    /// Timeout for fetching robots.txt (milliseconds)
    #[serde(default = "default_robots_timeout")]
    pub fetch_timeout_ms: u64,

    /// Upper bound on an honored `Crawl-delay` (milliseconds)
    #[serde(default = "default_max_crawl_delay")]
    pub max_crawl_delay_ms: u64,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_robots_ttl(),
            fetch_timeout_ms: default_robots_timeout(),
            max_crawl_delay_ms: default_max_crawl_delay(),
        }
    }
}

/// Smallest non-zero rate accepted (one request every ~17 minutes)
pub const MIN_RATE_RPS: f64 = 0.001;

/// Per-host request rate budgets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Requests per second applied to hosts without an explicit entry.
    /// Absent means unlimited.
    pub default_rps: Option<f64>,

    /// Host-specific overrides
    #[serde(default)]
    pub hosts: Vec<HostRateEntry>,
}

/// Rate budget for a single host
#[derive(Debug, Clone, Deserialize)]
pub struct HostRateEntry {
    pub host: String,
    pub rps: f64,
}

/// Egress proxy pool settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub servers: Vec<ProxyEntry>,
}

/// A single proxy declaration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_proxy_protocol")]
    pub protocol: String,
}

/// Structural mining (3D layers) engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MiningConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Mining service endpoint
    pub endpoint: Option<String>,

    /// Maximum DOM depth the engine explores
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Minimum importance score for a mined node to be kept
    #[serde(default = "default_min_importance")]
    pub min_importance: f64,

    /// Timeout for a single mining call (milliseconds)
    #[serde(default = "default_mining_timeout")]
    pub timeout_ms: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            max_depth: default_max_depth(),
            min_importance: default_min_importance(),
            timeout_ms: default_mining_timeout(),
        }
    }
}

/// OCR engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OcrConfig {
    #[serde(default)]
    pub enabled: bool,

    /// OCR service endpoint
    pub endpoint: Option<String>,

    /// Number of images recognized concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pre-compression hint forwarded to the OCR service (0.0 - 1.0)
    #[serde(default = "default_compression_ratio")]
    pub compression_ratio: f64,

    /// Minimum precision forwarded to the OCR service (0.0 - 1.0)
    #[serde(default = "default_min_precision")]
    pub min_precision: f64,

    /// Timeout for a single OCR call (milliseconds)
    #[serde(default = "default_ocr_timeout")]
    pub timeout_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            batch_size: default_batch_size(),
            compression_ratio: default_compression_ratio(),
            min_precision: default_min_precision(),
            timeout_ms: default_ocr_timeout(),
        }
    }
}

/// Sitemap walker settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SitemapConfig {
    /// Maximum number of sitemap documents fetched in one walk
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Timeout for fetching a single sitemap document (milliseconds)
    #[serde(default = "default_sitemap_timeout")]
    pub fetch_timeout_ms: u64,

    /// Weight kept from the previous success rate on each node (0.0 - 1.0)
    #[serde(default = "default_success_decay")]
    pub success_decay: f64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            fetch_timeout_ms: default_sitemap_timeout(),
            success_decay: default_success_decay(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database holding proxy stats and the crawl log.
    /// Absent keeps everything in memory.
    pub database_path: Option<String>,
}

fn default_service_id() -> String {
    "default".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_robots_ttl() -> u64 {
    24 * 60 * 60
}

fn default_robots_timeout() -> u64 {
    5_000
}

fn default_max_crawl_delay() -> u64 {
    30_000
}

fn default_proxy_protocol() -> String {
    "http".to_string()
}

fn default_max_depth() -> u32 {
    3
}

fn default_min_importance() -> f64 {
    0.5
}

fn default_mining_timeout() -> u64 {
    60_000
}

fn default_batch_size() -> usize {
    4
}

fn default_compression_ratio() -> f64 {
    0.1
}

fn default_min_precision() -> f64 {
    0.9
}

fn default_ocr_timeout() -> u64 {
    30_000
}

fn default_max_nodes() -> usize {
    1_000
}

fn default_sitemap_timeout() -> u64 {
    10_000
}

fn default_success_decay() -> f64 {
    0.9
}
