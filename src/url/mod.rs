//! URL handling module for LightCrawl
//!
//! This module provides URL normalization (used for visited-set keys) and
//! host/origin extraction (used for rate-limit and robots cache keys).

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, origin_key};
pub use normalize::normalize_url;
