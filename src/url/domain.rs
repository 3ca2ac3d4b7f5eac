use url::Url;

/// Extracts the host key used for same-domain checks
///
/// This is the lowercase host plus an explicit non-default port, so that
/// `http://127.0.0.1:8080` and `http://127.0.0.1:9090` are different sites
/// while `https://example.com:443` and `https://example.com` are the same.
/// Subdomains are never folded into their parent.
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The host key
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wheres_my_value::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns true when both URLs resolve to the same host key
pub fn same_domain(url: &Url, domain: &str) -> bool {
    extract_domain(url).map_or(false, |d| d == domain)
}
