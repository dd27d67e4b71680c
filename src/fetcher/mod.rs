//! # Page Fetcher Module
//!
//! Retrieves a single web page over HTTP(S) with a browser-like identity.
//! This is the first stage of a scan: its output feeds the analyzer.
//!
//! Failures are never retried. Transport problems, timeouts and non-2xx
//! answers are all reported through [`FetchError`].

mod config;
mod error;

pub use config::{FetcherConfig, FetcherConfigBuilder, DEFAULT_USER_AGENT};
pub use error::FetchError;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use tracing::{debug, info, instrument};
use url::Url;

/// A fetched page body together with where it finally came from
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub requested_url: Url,

    /// URL after following redirects
    pub final_url: Url,

    /// HTTP status code of the final response
    pub status: u16,

    /// Decoded response body
    pub body: String,
}

/// HTTP fetcher for single pages
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher from the given configuration
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout())
            .redirect(Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration this fetcher was built with
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// GET the page at `url`
    ///
    /// # Returns
    ///
    /// The decoded body of a 2xx response, or a [`FetchError`]
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        info!("Fetching page");
        let secs = self.config.timeout_secs;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_request(url.as_str(), secs, e))?;

        let status = response.status();
        let final_url = response.url().clone();
        if final_url != *url {
            debug!("Redirected to {}", final_url);
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_request(url.as_str(), secs, e))?;
        debug!("Received {} bytes", body.len());

        Ok(FetchedPage {
            requested_url: url.clone(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader(format!("{value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn page_url(server: &Server, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_browser_identity() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", Matcher::Regex("^Mozilla/5.0".to_string()))
            .match_header("accept-language", Matcher::Regex("en-US".to_string()))
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>hello</body></html>")
            .expect(1)
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let page = fetcher.fetch(&page_url(&server, "/page")).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let mut server = Server::new_async().await;
        let target = format!("{}/final", server.url());
        let redirect = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", &target)
            .create_async()
            .await;
        let landing = server
            .mock("GET", "/final")
            .with_status(200)
            .with_body("<html><body>landed</body></html>")
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let page = fetcher.fetch(&page_url(&server, "/start")).await.unwrap();

        assert_eq!(page.final_url.path(), "/final");
        assert!(page.body.contains("landed"));
        redirect.assert_async().await;
        landing.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let result = fetcher.fetch(&page_url(&server, "/missing")).await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/boom")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::default()).unwrap();
        let result = fetcher.fetch(&page_url(&server, "/boom")).await;

        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_times_out_when_server_never_answers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/slow", listener.local_addr().unwrap())).unwrap();
        let server = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let fetcher = Fetcher::new(FetcherConfig::builder().timeout_secs(1).build()).unwrap();
        let started = std::time::Instant::now();
        let result = fetcher.fetch(&url).await;

        assert!(
            matches!(result, Err(FetchError::Timeout { secs: 1, .. })),
            "{result:?}"
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        server.abort();
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let config = FetcherConfig::builder()
            .accept_language("bad\nvalue")
            .build();
        let result = Fetcher::new(config);
        assert!(matches!(result, Err(FetchError::InvalidHeader(_))));
    }
}
