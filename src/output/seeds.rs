//! Seed list export

use crate::sitemap::SeedUrl;
use crate::CrawlError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes seeds as a pretty-printed JSON array followed by a newline
pub fn write_seeds<W: Write>(writer: W, seeds: &[SeedUrl]) -> Result<(), CrawlError> {
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, seeds)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes seeds to `path`, replacing any existing file
pub fn write_seeds_to_file(path: &Path, seeds: &[SeedUrl]) -> Result<(), CrawlError> {
    let file = File::create(path)?;
    write_seeds(BufWriter::new(file), seeds)?;
    tracing::info!(path = %path.display(), count = seeds.len(), "Seeds written");
    Ok(())
}
