//! Generic staged pipeline
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Each stage runs on its own
//! task and talks to its neighbours through bounded channels carrying
//! [`Item`]s, so a slow consumer applies backpressure to its producer.
//! Cancellation is cooperative: every stage receives a clone of the same
//! [`tokio_util::sync::CancellationToken`].

mod runner;
mod stage;

pub use runner::Pipeline;
pub use stage::{send_or_cancel, Item, Stage};
