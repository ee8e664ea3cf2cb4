//! Output module for reporting orchestrator activity
//!
//! This module handles:
//! - Exporting discovered seed URLs as JSON
//! - Loading and printing proxy and crawl log statistics

mod seeds;
pub mod stats;

pub use seeds::{write_seeds, write_seeds_to_file};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
