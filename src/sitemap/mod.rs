//! Sitemap-based seed discovery
//!
//! This module handles:
//! - Parsing URL-set and sitemap-index documents
//! - Walking sitemap trees with a shared visited set
//! - Filtering page URLs against a [`SchemaRelationship`]
//! - Producing [`SeedUrl`] records for later crawls

mod filter;
mod parser;
mod walker;

pub use filter::SchemaRelationship;
pub use parser::{parse_sitemap, SitemapDocument, SitemapEntry, DEFAULT_PRIORITY};
pub use walker::{SitemapWalker, WalkReport, WalkStats};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where a seed URL was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedSource {
    Sitemap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMetadata {
    /// True when a relationship filter was applied and this URL matched it
    pub schema_related: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<SchemaRelationship>,
}

/// A URL discovered for a later crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUrl {
    pub url: Url,
    pub priority: f64,
    pub source: SeedSource,
    pub service_id: String,
    pub collected_at: DateTime<Utc>,
    pub metadata: SeedMetadata,
}
