use futures::StreamExt;
use thiserror::Error;

use crate::config::FetchConfig;
use crate::diff::compare_old_and_new;
use crate::error::Error;
use crate::feed::model::{Entry, Feed};
use crate::feed::parser::{parse_feed_str, parse_str, ParseError};
use crate::util::{decode_document, validate_feed_url};

/// Errors that can occur while retrieving a document over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL failed validation (bad scheme, private host, etc.)
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Network-level error (DNS, connection, TLS, body read, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Response status other than 200 OK
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Result of polling a feed against an earlier snapshot.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    /// The freshly fetched snapshot, to keep for the next poll.
    pub feed: Feed,
    /// Decoded document text as served.
    pub raw: String,
    /// Entries of `feed` with no identity match in the previous snapshot.
    pub new_entries: Vec<Entry>,
}

/// Retrieves and decodes Atom documents over HTTP.
///
/// The HTTP client is injected so redirect, TLS and connection-pool policy
/// stay under the caller's control. No retries and no caching: each call is
/// exactly one GET. Dropping the returned future cancels the request.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl FeedFetcher {
    /// Wraps an existing client. `config` still governs the timeout, size
    /// limit and URL policy.
    pub fn new(client: reqwest::Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Builds a fetcher with a client derived from `config`.
    pub fn from_config(config: FetchConfig) -> Result<Self, FetchError> {
        let client = config.build_client()?;
        Ok(Self::new(client, config))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches a single Atom `<entry>` document.
    ///
    /// Returns the parsed entry together with the decoded document text, so
    /// callers can inspect or cache what the server sent.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - URL rejected before any I/O
    /// - [`FetchError::Network`] - request could not be sent or body failed
    /// - [`FetchError::HttpStatus`] - any status other than 200
    /// - [`FetchError::Timeout`] - configured timeout elapsed
    /// - [`FetchError::ResponseTooLarge`] - body exceeded `max_body_bytes`
    /// - [`crate::ParseError`] - body is not a decodable entry
    pub async fn parse_from_url(&self, url: &str) -> Result<(Entry, String), Error> {
        let bytes = self.fetch_bytes(url).await?;
        let text = decode_document(&bytes).map_err(ParseError::from)?;
        let entry = parse_str(&text)?;
        Ok((entry, text.into_owned()))
    }

    /// Fetches a full Atom `<feed>` document. Same failure modes as
    /// [`FeedFetcher::parse_from_url`].
    pub async fn fetch_feed(&self, url: &str) -> Result<(Feed, String), Error> {
        let bytes = self.fetch_bytes(url).await?;
        let text = decode_document(&bytes).map_err(ParseError::from)?;
        let feed = parse_feed_str(&text)?;
        Ok((feed, text.into_owned()))
    }

    /// Fetches the current snapshot of `url` and reports entries that are
    /// not in `previous`, using the default entry identity.
    pub async fn changes_since(&self, previous: &Feed, url: &str) -> Result<FeedUpdate, Error> {
        let (feed, raw) = self.fetch_feed(url).await?;
        let new_entries: Vec<Entry> = compare_old_and_new(previous, &feed)
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!(
            url = %url,
            entries = feed.entries.len(),
            new = new_entries.len(),
            "Compared feed against previous snapshot"
        );

        Ok(FeedUpdate {
            feed,
            raw,
            new_entries,
        })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let validated = validate_feed_url(url, self.config.allow_private_hosts)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        tokio::time::timeout(self.config.timeout(), self.get(validated))
            .await
            .map_err(|_| {
                tracing::debug!(url = %url, timeout_secs = self.config.timeout_secs, "Feed request timed out");
                FetchError::Timeout
            })?
    }

    async fn get(&self, url: url::Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %url, "Fetching feed document");

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(url = %url, status = status.as_u16(), "Feed request returned non-200 status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, self.config.max_body_bytes).await?;
        tracing::debug!(url = %url, bytes = bytes.len(), "Fetched feed document");
        Ok(bytes)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
