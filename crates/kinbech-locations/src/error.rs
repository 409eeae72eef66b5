use thiserror::Error;

pub use kinbech_location_client::FetchError;

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SelectorError>;
