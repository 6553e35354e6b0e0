//! Stage trait and the payload carried between stages

use crate::fetch::FetchRecord;
use crate::{StageError, StageResult};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A value travelling through the pipeline
///
/// Every channel carries the same type; which variant a stage expects depends
/// on its position (the source emits URLs, the fetch stage turns URLs into
/// records, the sink consumes records).
#[derive(Debug)]
pub enum Item {
    /// A URL as read from the input
    Url(String),

    /// The outcome of fetching one URL
    Record(FetchRecord),
}

impl Item {
    /// Short variant name for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Item::Url(_) => "url",
            Item::Record(_) => "record",
        }
    }
}

/// One step of a [`Pipeline`](crate::pipeline::Pipeline)
///
/// A stage consumes `input` until it is exhausted (or it has no use for input
/// at all) and writes to `output`. The runner owns the wiring: `output` is
/// closed for the downstream stage as soon as `execute` returns, because the
/// sender is dropped with it. Any per-stage settings are bound when the stage
/// is constructed.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in log spans
    fn name(&self) -> &'static str;

    /// Runs the stage to completion
    ///
    /// Implementations must check `cancel` at their suspension points and
    /// return [`StageError::Cancelled`] once it fires.
    async fn execute(
        &self,
        cancel: CancellationToken,
        input: mpsc::Receiver<Item>,
        output: mpsc::Sender<Item>,
    ) -> StageResult<()>;
}

/// Sends `item` downstream, giving up if cancellation fires while the
/// channel is full
pub async fn send_or_cancel(
    output: &mpsc::Sender<Item>,
    item: Item,
    cancel: &CancellationToken,
) -> StageResult<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::Cancelled),
        sent = output.send(item) => sent.map_err(|_| StageError::DownstreamClosed),
    }
}
