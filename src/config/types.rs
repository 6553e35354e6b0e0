use serde::Deserialize;

/// Capacity of every inter-stage channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 50;

/// Ceiling on concurrent requests inside the fetch stage
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;

/// Directory downloaded bodies are written to
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Main configuration structure for url-harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pipeline wiring and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Capacity of the bounded channels between stages
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Maximum number of outstanding HTTP requests
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Seconds to wait for the pipeline to wind down after a shutdown signal
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request deadline in seconds; no deadline when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory downloaded bodies are written to
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("url-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}
