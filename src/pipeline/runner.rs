//! Pipeline runner: wires stages together and waits for them

use crate::pipeline::stage::{Item, Stage};
use crate::{HarvestError, Result, StageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// An ordered list of stages connected by bounded channels
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    channel_capacity: usize,
    tracker: TaskTracker,
}

impl Pipeline {
    /// Creates an empty pipeline whose channels hold `channel_capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `channel_capacity` is zero, like [`mpsc::channel`].
    pub fn new(channel_capacity: usize) -> Self {
        assert!(channel_capacity > 0, "channel capacity must be non-zero");
        Self {
            stages: Vec::new(),
            channel_capacity,
            tracker: TaskTracker::new(),
        }
    }

    /// Appends a stage; items flow in the order stages are added
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage has been added
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage concurrently and waits for them to finish
    ///
    /// `input` feeds the first stage. Stage `i`'s output feeds stage `i + 1`;
    /// whatever the last stage emits is drained and discarded. A failing
    /// stage is logged and does not stop its siblings: downstream stages
    /// simply see end-of-stream.
    ///
    /// If `cancel` fires first, returns [`HarvestError::Cancelled`] without
    /// waiting. Stage tasks are left running (not aborted) so they can
    /// observe the token themselves and finish any write in progress.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        input: mpsc::Receiver<Item>,
    ) -> Result<()> {
        if self.stages.is_empty() {
            tracing::warn!("No stages in pipeline");
            return Ok(());
        }

        tracing::debug!(
            stages = self.stages.len(),
            channel_capacity = self.channel_capacity,
            "Starting pipeline"
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.stages.len());
        let mut next_input = input;

        for (index, stage) in self.stages.iter().enumerate() {
            let (tx, rx) = mpsc::channel(self.channel_capacity);
            let stage_input = std::mem::replace(&mut next_input, rx);
            let stage = Arc::clone(stage);
            let cancel = cancel.clone();
            let span = tracing::info_span!("stage", index, name = stage.name());

            handles.push(self.tracker.spawn(
                async move {
                    // `tx` moves into execute and is dropped when it returns,
                    // closing the channel for the next stage.
                    match stage.execute(cancel, stage_input, tx).await {
                        Ok(()) => tracing::debug!("Stage finished"),
                        Err(StageError::Cancelled) => tracing::info!("Stage cancelled"),
                        Err(e) => tracing::error!(error = %e, "Stage execution failed"),
                    }
                }
                .instrument(span),
            ));
        }

        let tail = tokio::spawn(drain(next_input));

        let all_stages = async {
            for (index, handle) in handles.into_iter().enumerate() {
                if let Err(e) = handle.await {
                    tracing::error!(stage = index, error = %e, "Stage task panicked");
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Pipeline cancelled");
                Err(HarvestError::Cancelled)
            }
            _ = all_stages => {
                if let Ok(discarded) = tail.await {
                    if discarded > 0 {
                        tracing::debug!(discarded, "Discarded items emitted by the last stage");
                    }
                }
                tracing::info!("Pipeline completed successfully");
                Ok(())
            }
        }
    }

    /// Waits up to `grace` for stage tasks still running after a cancelled
    /// [`run`](Self::run)
    ///
    /// Returns false if some stage had not finished when `grace` elapsed.
    pub async fn wait_for_stages(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}

/// Consumes the last stage's output so it never blocks on a full channel
async fn drain(mut rx: mpsc::Receiver<Item>) -> usize {
    let mut count = 0;
    while rx.recv().await.is_some() {
        count += 1;
    }
    count
}
