use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::ChannelSink;
use crate::config::ImporterConfig;
use crate::errors::ImportError;
use crate::models::ImportedChannel;

/// Submits channels to a storage API as `POST {base}/api/channels`
#[derive(Debug, Clone)]
pub struct HttpChannelSink {
    client: Client,
    endpoint: String,
}

impl HttpChannelSink {
    pub fn new(config: &ImporterConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: format!("{}/api/channels", config.api_base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChannelSink for HttpChannelSink {
    async fn submit(&self, channel: &ImportedChannel) -> Result<(), ImportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(channel)
            .send()
            .await
            .map_err(|source| ImportError::Request {
                name: channel.name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImportError::Rejected {
                name: channel.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Submitted channel '{}' to {}", channel.name, self.endpoint);
        Ok(())
    }
}

/// Keeps submitted channels in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryChannelSink {
    channels: Mutex<Vec<ImportedChannel>>,
    rejected_names: HashSet<String>,
}

impl MemoryChannelSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects channels with the given names
    pub fn rejecting<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: Mutex::new(Vec::new()),
            rejected_names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn channels(&self) -> Vec<ImportedChannel> {
        self.channels.lock().await.clone()
    }
}

#[async_trait]
impl ChannelSink for MemoryChannelSink {
    async fn submit(&self, channel: &ImportedChannel) -> Result<(), ImportError> {
        if self.rejected_names.contains(&channel.name) {
            return Err(ImportError::Rejected {
                name: channel.name.clone(),
                status: 500,
                body: "rejected".to_string(),
            });
        }
        self.channels.lock().await.push(channel.clone());
        Ok(())
    }
}
