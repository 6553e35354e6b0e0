//! Fetch stage: the bounded worker pool
//!
//! Each input URL is handed to its own task, but only after a permit is
//! taken from a semaphore sized to `max_in_flight`. The permit lives inside
//! the task and is released when the task ends, whatever path it takes.
//! All tasks are joined before statistics are reported.

use crate::fetch::{normalize_url, FetchError, FetchRecord, FetchStats, FetchSummary, Fetcher};
use crate::pipeline::{Item, Stage};
use crate::{StageError, StageResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Turns URLs into [`FetchRecord`]s with at most `max_in_flight` requests
/// outstanding
///
/// Records come out in completion order, not input order.
pub struct FetchStage<F> {
    fetcher: Arc<F>,
    max_in_flight: usize,
}

impl<F: Fetcher> FetchStage<F> {
    /// # Panics
    ///
    /// Panics if `max_in_flight` is zero.
    pub fn new(fetcher: F, max_in_flight: usize) -> Self {
        assert!(max_in_flight > 0, "max_in_flight must be non-zero");
        Self {
            fetcher: Arc::new(fetcher),
            max_in_flight,
        }
    }

    /// Consumes `input` until it closes or `cancel` fires
    ///
    /// Every dispatched URL yields exactly one record on `output`. On
    /// cancellation no further URLs are dispatched, in-flight workers are
    /// still joined, and [`StageError::Cancelled`] is returned.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<Item>,
        output: mpsc::Sender<Item>,
    ) -> StageResult<FetchSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let stats = Arc::new(FetchStats::default());
        let mut workers = JoinSet::new();
        let mut outcome = Ok(());

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome = Err(StageError::Cancelled);
                    break;
                }
                item = input.recv() => item,
            };

            let url = match item {
                Some(Item::Url(url)) => url,
                Some(other) => {
                    tracing::warn!(kind = other.kind(), "Invalid input item, expected a URL");
                    continue;
                }
                None => break,
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome = Err(StageError::Cancelled);
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            // Reap finished workers so the set stays bounded by max_in_flight
            while let Some(joined) = workers.try_join_next() {
                log_worker_panic(joined);
            }

            workers.spawn(fetch_one(
                Arc::clone(&self.fetcher),
                url,
                permit,
                output.clone(),
                cancel.clone(),
                Arc::clone(&stats),
            ));
        }

        if outcome.is_err() {
            tracing::warn!(in_flight = workers.len(), "Download interrupted");
        }

        while let Some(joined) = workers.join_next().await {
            log_worker_panic(joined);
        }

        let summary = stats.summary();
        tracing::info!(
            successful = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            avg_duration_ms = summary.mean_millis,
            "Download statistics"
        );

        outcome.map(|()| summary)
    }
}

#[async_trait]
impl<F: Fetcher> Stage for FetchStage<F> {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        input: mpsc::Receiver<Item>,
        output: mpsc::Sender<Item>,
    ) -> StageResult<()> {
        self.run(cancel, input, output).await.map(|_| ())
    }
}

/// Downloads one URL and emits its record
async fn fetch_one<F: Fetcher>(
    fetcher: Arc<F>,
    raw_url: String,
    _permit: OwnedSemaphorePermit,
    output: mpsc::Sender<Item>,
    cancel: CancellationToken,
    stats: Arc<FetchStats>,
) {
    let url = normalize_url(&raw_url);
    tracing::debug!(url = %url, "Downloading URL");

    let started = Instant::now();
    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = fetcher.fetch(&url) => result,
    };
    let duration_millis = elapsed_millis(started);

    match &outcome {
        Ok(body) => tracing::debug!(url = %url, bytes = body.len(), "Download successful"),
        Err(FetchError::Cancelled) => tracing::debug!(url = %url, "Download cancelled"),
        Err(e) => tracing::warn!(url = %url, error = %e, "Download failed"),
    }

    let record = FetchRecord {
        url,
        outcome,
        duration_millis,
    };
    stats.record(&record);

    if output.send(Item::Record(record)).await.is_err() {
        tracing::debug!("Downstream closed, dropping record");
    }
}

/// Whole milliseconds since `started`, floored at 1
fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

fn log_worker_panic(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Download worker panicked");
    }
}
