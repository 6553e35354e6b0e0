use thiserror::Error;

/// Why a single URL could not be fetched
///
/// These never abort the stage; they travel downstream inside a
/// [`FetchRecord`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request creation failed: {0}")]
    InvalidRequest(String),

    #[error("download failed: {0}")]
    Transport(String),

    #[error("bad status: {0}")]
    Status(u16),

    #[error("read failed: {0}")]
    Body(String),

    #[error("download cancelled")]
    Cancelled,
}

/// Outcome of fetching one URL
#[derive(Debug)]
pub struct FetchRecord {
    /// The URL as requested, after scheme normalization
    pub url: String,

    /// Response body on success
    pub outcome: Result<Vec<u8>, FetchError>,

    /// Wall-clock time spent on the request, never below 1
    pub duration_millis: u64,
}

impl FetchRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}
