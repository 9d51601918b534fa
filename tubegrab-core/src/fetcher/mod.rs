//! Tools for fetching data from a URL.
//!
//! The [`Fetcher`] downloads one stream to a file, sequentially, in ranged chunks when the size
//! is known, and reports progress to a [`ProgressSink`].

use crate::error::{Error, Result};
use crate::utils::file_system;
use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE, USER_AGENT};
use std::cmp::min;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub mod deps;
pub mod streams;

/// Receives `(downloaded, total)` notifications while a stream is retrieved.
///
/// `downloaded` never decreases during one retrieval. `total` is 0 when the size is unknown.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, downloaded: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, downloaded: u64, total: u64) {
        self(downloaded, total)
    }
}

/// A sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _downloaded: u64, _total: u64) {}
}

/// The default size of a ranged request. Large single requests get throttled by YouTube.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// The fetcher is responsible for downloading data from a URL.
pub struct Fetcher {
    /// The URL from which to download the data.
    url: String,
    /// The headers to send with every request.
    headers: HashMap<String, String>,
    /// The user agent, used unless `headers` already carries one.
    user_agent: Option<String>,
    /// The exact size of the asset. Enables ranged requests.
    total_size: Option<u64>,
    /// The size of each ranged request in bytes.
    chunk_size: u64,
}

impl fmt::Display for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetcher(url={}, size={:?}, chunk={})",
            self.url, self.total_size, self.chunk_size
        )
    }
}

impl Fetcher {
    /// Creates a new fetcher for the given URL.
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: url.as_ref().to_string(),
            headers: HashMap::new(),
            user_agent: None,
            total_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Adds headers sent with every request.
    pub fn with_headers(mut self, headers: &HashMap<String, String>) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Sets the user agent used when no `User-Agent` header was given.
    pub fn with_user_agent(mut self, user_agent: impl AsRef<str>) -> Self {
        self.user_agent = Some(user_agent.as_ref().to_string());
        self
    }

    /// Sets the exact size of the asset, enabling ranged requests.
    pub fn with_total_size(mut self, size: Option<u64>) -> Self {
        self.total_size = size.filter(|size| *size > 0);
        self
    }

    /// Configures the size of each ranged request in bytes.
    pub fn with_chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Fetch(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Fetch(format!("invalid header value: {e}")))?;
            map.insert(name, value);
        }

        if !map.contains_key(USER_AGENT) {
            if let Some(user_agent) = &self.user_agent {
                let value = HeaderValue::from_str(user_agent)
                    .map_err(|e| Error::Fetch(format!("invalid user agent: {e}")))?;
                map.insert(USER_AGENT, value);
            }
        }

        Ok(map)
    }

    /// Downloads the asset and writes it to `destination`, replacing any existing file.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// This function will return an error if the asset cannot be downloaded or written.
    pub async fn fetch_asset(
        &self,
        destination: impl AsRef<Path> + fmt::Debug,
        sink: &dyn ProgressSink,
    ) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching asset from {} to {:?}", self, destination);

        file_system::create_parent_dir(&destination)?;

        let client = reqwest::Client::builder()
            .default_headers(self.header_map()?)
            .build()?;
        let mut file = file_system::create_file(&destination).await?;

        let written = match self.total_size {
            Some(total) => self.fetch_ranged(&client, &mut file, total, sink).await?,
            None => {
                let response = client.get(&self.url).send().await?.error_for_status()?;
                let total = response.content_length().unwrap_or(0);
                let mut downloaded = 0;
                Self::write_body(response, &mut file, &mut downloaded, total, sink).await?;
                downloaded
            }
        };

        file.flush().await?;
        Ok(written)
    }

    async fn fetch_ranged(
        &self,
        client: &reqwest::Client,
        file: &mut tokio::fs::File,
        total: u64,
        sink: &dyn ProgressSink,
    ) -> Result<u64> {
        let mut downloaded = 0;

        while downloaded < total {
            let end = min(downloaded + self.chunk_size, total) - 1;

            let response = client
                .get(&self.url)
                .header(RANGE, format!("bytes={}-{}", downloaded, end))
                .send()
                .await?
                .error_for_status()?;

            let status = response.status();
            let before = downloaded;

            if status == StatusCode::OK && before > 0 {
                return Err(Error::Fetch(
                    "server ignored the range request mid-download".to_string(),
                ));
            }

            Self::write_body(response, file, &mut downloaded, total, sink).await?;

            // a 200 means the whole body came in one go
            if status != StatusCode::PARTIAL_CONTENT {
                break;
            }
            if downloaded == before {
                return Err(Error::Fetch(format!(
                    "empty response for bytes {}-{}",
                    before, end
                )));
            }
        }

        Ok(downloaded)
    }

    async fn write_body(
        response: reqwest::Response,
        file: &mut tokio::fs::File,
        downloaded: &mut u64,
        total: u64,
        sink: &dyn ProgressSink,
    ) -> Result<()> {
        let mut stream = response.bytes_stream();
        let mut buffer = Vec::with_capacity(1024 * 1024);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            *downloaded += chunk.len() as u64;
            sink.on_progress(*downloaded, total.max(*downloaded));

            if buffer.len() >= 1024 * 1024 {
                file.write_all(&buffer).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            file.write_all(&buffer).await?;
        }

        Ok(())
    }
}
