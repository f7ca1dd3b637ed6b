//! Channel import
//!
//! Maps selected staged records to the storage schema and submits them one
//! at a time, in staged order, to a [`ChannelSink`].

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ImportPolicy;
use crate::errors::ImportError;
use crate::models::{ImportFailure, ImportReport, ImportedChannel, ParseSummary, PendingChannel};

pub mod sinks;

pub use sinks::{HttpChannelSink, MemoryChannelSink};

/// Storage collaborator receiving imported channels
#[async_trait]
pub trait ChannelSink: Send + Sync {
    async fn submit(&self, channel: &ImportedChannel) -> Result<(), ImportError>;
}

#[derive(Clone)]
pub struct Importer {
    sink: Arc<dyn ChannelSink>,
    policy: ImportPolicy,
}

impl Importer {
    pub fn new(sink: Arc<dyn ChannelSink>, policy: ImportPolicy) -> Self {
        Self { sink, policy }
    }

    /// Submit each record sequentially. Successful submissions are never
    /// rolled back.
    pub async fn run(&self, batch: Vec<(usize, PendingChannel)>) -> ImportReport {
        self.run_with_progress(batch, |_| {}).await
    }

    /// Like [`Importer::run`], calling `on_submitted` with the staged index of
    /// each record as soon as the sink accepts it
    pub async fn run_with_progress<F>(
        &self,
        batch: Vec<(usize, PendingChannel)>,
        mut on_submitted: F,
    ) -> ImportReport
    where
        F: FnMut(usize) + Send,
    {
        info!("Importing {} channels ({} policy)", batch.len(), self.policy);

        let mut attempted = 0;
        let mut imported = ParseSummary::default();
        let mut submitted = Vec::with_capacity(batch.len());
        let mut failures = Vec::new();
        let mut aborted = false;

        for (index, channel) in batch {
            attempted += 1;
            match self.sink.submit(&ImportedChannel::from(&channel)).await {
                Ok(()) => {
                    imported.record(channel.content_type);
                    submitted.push(index);
                    on_submitted(index);
                }
                Err(e) => {
                    warn!("Failed to import channel #{} '{}': {}", index, channel.name, e);
                    failures.push(ImportFailure {
                        index,
                        name: channel.name,
                        error: e.to_string(),
                    });
                    if self.policy == ImportPolicy::FailFast {
                        aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            "Import finished: {} imported, {} failed{}",
            imported,
            failures.len(),
            if aborted { " (stopped early)" } else { "" }
        );

        ImportReport {
            attempted,
            imported,
            submitted,
            failures,
            aborted,
            finished_at: Utc::now(),
        }
    }
}
