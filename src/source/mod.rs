//! Source stage: reads URLs from the input file
//!
//! The file is line-oriented with a header on the first line. Every other
//! non-blank line, trimmed, is one URL. Bytes that are not valid UTF-8 are
//! replaced rather than rejected, so one damaged line never hides the rest.

use crate::pipeline::{send_or_cancel, Item, Stage};
use crate::{StageError, StageResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Emits the URLs listed in a file, in file order
#[derive(Debug, Clone)]
pub struct SourceStage {
    path: PathBuf,
}

impl SourceStage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the file and sends each URL to `output`
    ///
    /// Returns the number of URLs emitted. The header line is dropped
    /// unconditionally, even if it looks like a URL.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        output: mpsc::Sender<Item>,
    ) -> StageResult<usize> {
        let file = File::open(&self.path).await.map_err(|e| self.input_error(e))?;
        let mut lines = BufReader::new(file).split(b'\n');
        let mut is_header = true;
        let mut url_count = 0;

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(emitted = url_count, "File reading interrupted");
                    return Err(StageError::Cancelled);
                }
                line = lines.next_segment() => line.map_err(|e| self.input_error(e))?,
            };
            let Some(line) = line else {
                break;
            };

            if is_header {
                is_header = false;
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            let url = line.trim();
            if url.is_empty() {
                continue;
            }

            tracing::debug!(url, "Read URL");
            send_or_cancel(&output, Item::Url(url.to_string()), &cancel).await?;
            url_count += 1;
        }

        tracing::info!(total_urls = url_count, "Finished reading URLs");
        Ok(url_count)
    }

    fn input_error(&self, source: std::io::Error) -> StageError {
        StageError::Input {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Stage for SourceStage {
    fn name(&self) -> &'static str {
        "source"
    }

    /// Ignores `input`; the file is the only data source
    async fn execute(
        &self,
        cancel: CancellationToken,
        _input: mpsc::Receiver<Item>,
        output: mpsc::Sender<Item>,
    ) -> StageResult<()> {
        self.run(cancel, output).await.map(|_| ())
    }
}
