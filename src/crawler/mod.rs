//! Crawler module for orchestrating individual crawls
//!
//! This module contains the core crawl pipeline, including:
//! - Per-host rate limiting
//! - HTTP client construction for direct and proxied connections
//! - Bounded-concurrency batch dispatch for engine work
//! - Crawl result types and outcome events
//! - The orchestrator that ties policy checks and engines together

mod batch;
mod events;
mod fetcher;
mod orchestrator;
mod rate_limiter;
mod result;

pub use batch::{run_batches, BatchOutcome, BatchSummary};
pub use events::{CrawlEvent, EventBus};
pub use fetcher::{build_http_client, ConnectionConfig};
pub use orchestrator::{CrawlContext, Orchestrator};
pub use rate_limiter::RateLimiter;
pub use result::{
    CrawlData, CrawlMetadata, CrawlOptions, CrawlRequest, CrawlResult, Service, ServiceError,
};
