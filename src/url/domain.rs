use url::Url;

/// Extracts the lowercase host from a URL
///
/// The host keys per-host rate budgets. Ports are not part of the host, so
/// `example.com:8080` and `example.com` share one budget.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lightcrawl::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Builds the origin key (`scheme://host[:port]`) for a URL
///
/// robots.txt applies per origin, so this is the robots cache key. Default
/// ports are omitted.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lightcrawl::url::origin_key;
///
/// let url = Url::parse("https://example.com/a/b?c=d").unwrap();
/// assert_eq!(origin_key(&url), Some("https://example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(origin_key(&url), Some("http://127.0.0.1:8080".to_string()));
/// ```
pub fn origin_key(url: &Url) -> Option<String> {
    let host = extract_host(url)?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
