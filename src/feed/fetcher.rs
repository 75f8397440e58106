//! Raw feed retrieval.
//!
//! Every fetch bypasses intermediate caches: a `t=<unix-millis>` query pair
//! is appended to the source URL and the request carries
//! `Cache-Control: no-store`, so each polling cycle observes the origin's
//! current state. No cookies or credentials are sent. Any failure maps to
//! [`FetchError`] and means "skip this source for this cycle" — never fatal.

use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use thiserror::Error;
use url::Url;

/// Per-request timeout; a hung origin must not stall the whole cycle.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Feed bodies larger than this are junk or an attack, not news.
const MAX_FEED_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Errors that can occur while retrieving raw feed text.
///
/// All variants are skip-this-cycle conditions: the scheduler logs them and
/// retries the source on the next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Source URL could not be parsed
    #[error("Invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Build the HTTP client used for all feed fetches.
///
/// Redirects are followed (feeds move), cookies are never stored.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Fetch the current raw text of a feed source.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - the configured source URL is malformed
/// - [`FetchError::Timeout`] - no response within 30 seconds
/// - [`FetchError::Network`] - connection or TLS failure
/// - [`FetchError::HttpStatus`] - non-2xx response
/// - [`FetchError::ResponseTooLarge`] - body exceeded the size limit
pub async fn fetch_raw(client: &reqwest::Client, source_url: &str) -> Result<String, FetchError> {
    let url = cache_busted(source_url)?;

    let response = tokio::time::timeout(
        FETCH_TIMEOUT,
        client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send(),
    )
    .await
    .map_err(|_| FetchError::Timeout)?
    .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    // Feeds occasionally carry stray non-UTF8 bytes; scrape what survives.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Append a `t=<unix-millis>` query pair so shared caches cannot serve a
/// stale body even when they ignore `Cache-Control`.
fn cache_busted(source_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(source_url)?;
    url.query_pairs_mut()
        .append_pair("t", &Utc::now().timestamp_millis().to_string());
    Ok(url)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
