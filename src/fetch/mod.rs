//! Fetch stage: bounded-concurrency HTTP downloads
//!
//! This module contains:
//! - The [`Fetcher`] seam and its reqwest-backed [`HttpFetcher`]
//! - [`FetchRecord`], the per-URL outcome handed to the sink
//! - Atomic success/failure/latency statistics
//! - [`FetchStage`], the semaphore-gated worker pool

mod client;
mod record;
mod stage;
mod stats;

pub use client::{build_http_client, normalize_url, Fetcher, HttpFetcher};
pub use record::{FetchError, FetchRecord};
pub use stage::FetchStage;
pub use stats::{FetchStats, FetchSummary};
