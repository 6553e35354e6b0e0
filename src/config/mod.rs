//! Configuration module for url-harvest
//!
//! Settings are optional: every key has a default, so a run without a
//! configuration file behaves like one with an empty file.
//!
//! # Example
//!
//! ```no_run
//! use url_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("At most {} requests in flight", config.pipeline.max_in_flight);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, OutputConfig, PipelineConfig, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_OUTPUT_DIR,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
