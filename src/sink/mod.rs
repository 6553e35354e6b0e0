//! Sink stage: persists successful downloads
//!
//! Each successful [`FetchRecord`](crate::fetch::FetchRecord) is written to
//! `<directory>/<urlsafe-base64(url)>.txt`. Failed records and failed writes
//! are counted and skipped; neither stops the stage.

mod naming;

pub use naming::{file_name_for, file_path_for, FILE_SUFFIX};

use crate::fetch::FetchError;
use crate::pipeline::{Item, Stage};
use crate::{StageError, StageResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Final figures for one sink stage run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub written: u64,
    pub failed: u64,
    /// Records whose download was cancelled; not counted as failures
    pub cancelled: u64,
}

/// Writes record bodies into a directory
#[derive(Debug, Clone)]
pub struct SinkStage {
    directory: PathBuf,
}

impl SinkStage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Consumes records until the input closes or `cancel` fires
    ///
    /// The output directory (and its parents) is created first; failing to
    /// do so is the only error that ends the stage early. Cancellation is
    /// checked between records, so a write that already started completes.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<Item>,
    ) -> StageResult<SinkSummary> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| StageError::Output {
                path: self.directory.clone(),
                source,
            })?;

        let mut summary = SinkSummary::default();

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        written = summary.written,
                        failed = summary.failed,
                        "Persistence interrupted"
                    );
                    return Err(StageError::Cancelled);
                }
                item = input.recv() => item,
            };

            let record = match item {
                Some(Item::Record(record)) => record,
                Some(other) => {
                    tracing::warn!(kind = other.kind(), "Invalid input item, expected a record");
                    continue;
                }
                None => break,
            };

            let body = match record.outcome {
                Ok(body) => body,
                Err(FetchError::Cancelled) => {
                    summary.cancelled += 1;
                    continue;
                }
                Err(_) => {
                    summary.failed += 1;
                    continue;
                }
            };

            let path = file_path_for(&self.directory, &record.url);
            tracing::debug!(path = %path.display(), "Persisting file");

            match tokio::fs::write(&path, &body).await {
                Ok(()) => summary.written += 1,
                Err(e) => {
                    tracing::warn!(
                        url = %record.url,
                        path = %path.display(),
                        error = %e,
                        "Persist failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            successful = summary.written,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Persistence statistics"
        );
        Ok(summary)
    }
}

#[async_trait]
impl Stage for SinkStage {
    fn name(&self) -> &'static str {
        "sink"
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        input: mpsc::Receiver<Item>,
        _output: mpsc::Sender<Item>,
    ) -> StageResult<()> {
        self.run(cancel, input).await.map(|_| ())
    }
}
