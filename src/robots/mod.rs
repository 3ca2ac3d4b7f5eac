//! Robots.txt handling module
//!
//! robots.txt is fetched once per run from the start URL's host. Loading is
//! best effort: when it fails the caller disables robots checking instead of
//! blocking the crawl.

mod parser;

pub use parser::RobotsRules;

use crate::RobotsLoadError;
use reqwest::{Client, StatusCode};
use url::Url;

/// Fetches robots.txt for the host of `base_url`
///
/// A missing file (404/410) means there are no restrictions and yields
/// [`RobotsRules::allow_all`]. Any other non-success status or transport
/// failure is a [`RobotsLoadError`].
pub async fn fetch_robots(client: &Client, base_url: &Url) -> Result<RobotsRules, RobotsLoadError> {
    let robots_url = base_url
        .join("/robots.txt")
        .map_err(|e| RobotsLoadError::Request {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

    tracing::debug!("Fetching robots.txt from {}", robots_url);

    let response = client
        .get(robots_url.clone())
        .send()
        .await
        .map_err(|e| RobotsLoadError::Request {
            url: robots_url.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Ok(RobotsRules::allow_all());
    }
    if !status.is_success() {
        return Err(RobotsLoadError::Status {
            url: robots_url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| RobotsLoadError::Request {
        url: robots_url.to_string(),
        message: e.to_string(),
    })?;

    Ok(RobotsRules::from_content(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_robots_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/start/page", server.uri())).unwrap();
        let rules = fetch_robots(&Client::new(), &base).await.unwrap();

        assert!(rules.is_allowed(&format!("{}/public", server.uri()), "TestBot"));
        assert!(!rules.is_allowed(&format!("{}/private", server.uri()), "TestBot"));
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let rules = fetch_robots(&Client::new(), &base).await.unwrap();
        assert!(rules.is_allowed("/anything", "TestBot"));
    }

    #[tokio::test]
    async fn test_server_error_is_load_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let result = fetch_robots(&Client::new(), &base).await;
        assert!(matches!(
            result,
            Err(RobotsLoadError::Status { status: 503, .. })
        ));
    }
}
