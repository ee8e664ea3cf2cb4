//! Sitemap document parsing
//!
//! Handles the two document shapes of the sitemap protocol: a `<urlset>` of
//! page URLs and a `<sitemapindex>` of child sitemaps. Parsing goes through
//! scraper's lenient HTML tree builder, which keeps unknown elements like
//! `<urlset>` intact and tolerates the sloppy markup found in the wild.

use crate::CrawlError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Priority assumed for entries without a `<priority>` element
pub const DEFAULT_PRIORITY: f64 = 0.5;

/// One `<url>` entry of a URL set
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: Url,
    pub priority: f64,
}

/// Parsed contents of one sitemap document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitemapDocument {
    /// Page URLs, in document order
    pub entries: Vec<SitemapEntry>,
    /// Child sitemap URLs, in document order
    pub children: Vec<Url>,
}

impl SitemapDocument {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }
}

fn selector(css: &str, source: &Url) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| CrawlError::SitemapParse {
        url: source.to_string(),
        message: format!("invalid selector {}: {:?}", css, e),
    })
}

/// Parses a sitemap body fetched from `source`
///
/// Relative `<loc>` values are resolved against `source`; unparseable ones
/// are skipped. A body that is neither a URL set nor a sitemap index is an
/// error.
pub fn parse_sitemap(source: &Url, body: &str) -> Result<SitemapDocument, CrawlError> {
    let document = Html::parse_document(body);

    let urlset = selector("urlset", source)?;
    let index = selector("sitemapindex", source)?;

    let has_urlset = document.select(&urlset).next().is_some();
    let has_index = document.select(&index).next().is_some();
    if !has_urlset && !has_index {
        return Err(CrawlError::SitemapParse {
            url: source.to_string(),
            message: "no <urlset> or <sitemapindex> element".to_string(),
        });
    }

    let loc_selector = selector("loc", source)?;
    let priority_selector = selector("priority", source)?;
    let url_entries = selector("urlset > url", source)?;
    let child_sitemaps = selector("sitemapindex > sitemap", source)?;

    let entries = document
        .select(&url_entries)
        .filter_map(|element| {
            let loc = first_text(element, &loc_selector).and_then(|text| resolve(source, &text))?;
            let priority = first_text(element, &priority_selector)
                .and_then(|text| text.parse::<f64>().ok())
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 1.0))
                .unwrap_or(DEFAULT_PRIORITY);
            Some(SitemapEntry { loc, priority })
        })
        .collect();

    let children = document
        .select(&child_sitemaps)
        .filter_map(|element| first_text(element, &loc_selector).and_then(|text| resolve(source, &text)))
        .collect();

    Ok(SitemapDocument { entries, children })
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text: String = element.select(selector).next()?.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn resolve(source: &Url, loc: &str) -> Option<Url> {
    match source.join(loc) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(sitemap = %source, loc, error = %e, "Skipping unparseable <loc>");
            None
        }
    }
}
