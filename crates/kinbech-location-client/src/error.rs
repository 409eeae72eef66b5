use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Failures while talking to the location service.
///
/// All variants are non-fatal from the embedding application's point of view:
/// the selector surfaces them as a retryable status and never forwards them
/// to the selection listener.
#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service rejected the request (status {status}): {message}")]
    Service { status: u16, message: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response payload: {0}")]
    UnexpectedPayload(&'static str),
}

impl FetchError {
    /// Shorthand for a `success: false` envelope or an error status line.
    #[must_use]
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }
}
