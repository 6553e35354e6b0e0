//! url-harvest: a staged, bounded-concurrency URL downloader
//!
//! URLs are read from a line-oriented input file, fetched over HTTP with a
//! fixed ceiling on in-flight requests, and each successful body is written
//! to a file named after the URL. The three steps run as stages of a generic
//! [`pipeline::Pipeline`] connected by bounded channels.

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod sink;
pub mod source;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for url-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Pipeline cancelled")]
    Cancelled,
}

/// Errors a single pipeline stage can return
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage cancelled")]
    Cancelled,

    #[error("Downstream stage stopped accepting items")]
    DownstreamClosed,

    #[error("Failed to read input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to prepare output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for url-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for stage executions
pub type StageResult<T> = std::result::Result<T, StageError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchError, FetchRecord, FetchStage, Fetcher, HttpFetcher};
pub use pipeline::{Item, Pipeline, Stage};
pub use sink::SinkStage;
pub use source::SourceStage;

/// Builds the source -> fetch -> sink pipeline described by `config`
///
/// `input` is the URL list; bodies go to `config.output.directory`.
pub fn build_pipeline(config: &Config, input: &Path) -> Result<Pipeline> {
    let fetcher = HttpFetcher::from_config(&config.http)?;

    let mut pipeline = Pipeline::new(config.pipeline.channel_capacity);
    pipeline
        .add_stage(SourceStage::new(input))
        .add_stage(FetchStage::new(fetcher, config.pipeline.max_in_flight))
        .add_stage(SinkStage::new(&config.output.directory));
    Ok(pipeline)
}
