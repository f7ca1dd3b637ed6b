//! Playlist readers
//!
//! Obtain raw playlist text from a URL or from file contents. This is the
//! only place the import pipeline waits on I/O.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::FetchConfig;
use crate::errors::{FetchError, ReadError};

#[derive(Debug, Clone)]
pub struct PlaylistReader {
    client: Client,
    max_bytes: u64,
}

impl PlaylistReader {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            max_bytes: config.max_bytes,
        }
    }

    /// Download a playlist. Non-2xx responses and bodies over the size cap
    /// are errors; invalid UTF-8 sequences are replaced.
    pub async fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        info!("Fetching playlist from {}", url);

        let response = self.client.get(parsed).send().await.map_err(|e| {
            error!("Failed to connect to playlist URL {}: {}", url, e);
            FetchError::request(url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Playlist URL {} returned HTTP {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                max_bytes: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Error downloading playlist from {}: {}", url, e);
                FetchError::request(url, e)
            })?;
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    max_bytes: self.max_bytes,
                });
            }
        }

        debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Read a playlist file from disk
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<String, ReadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ReadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        decode_text(&path.display().to_string(), bytes)
    }
}

/// Decode uploaded playlist bytes as UTF-8 text
pub fn decode_text(name: &str, bytes: Vec<u8>) -> Result<String, ReadError> {
    String::from_utf8(bytes).map_err(|source| ReadError::Decode {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#EXTM3U\n#EXTINF:-1,One\nhttp://one\n").unwrap();

        let reader = PlaylistReader::new(&FetchConfig::default());
        let content = reader.read_file(file.path()).await.unwrap();

        assert!(content.contains("http://one"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let reader = PlaylistReader::new(&FetchConfig::default());

        let error = reader.read_file(dir.path().join("missing.m3u")).await.unwrap_err();
        assert!(matches!(error, ReadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_read_binary_file_is_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let reader = PlaylistReader::new(&FetchConfig::default());
        let error = reader.read_file(file.path()).await.unwrap_err();
        assert!(matches!(error, ReadError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_urls() {
        let reader = PlaylistReader::new(&FetchConfig::default());

        let error = reader.fetch_url("ftp://example.com/list.m3u").await.unwrap_err();
        assert!(matches!(error, FetchError::InvalidUrl { .. }));

        let error = reader.fetch_url("not a url").await.unwrap_err();
        assert!(matches!(error, FetchError::InvalidUrl { .. }));
    }
}
