use thiserror::Error;

/// Failures that cross the pipeline / API boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("No news provider returned articles")]
    ProviderUnavailable,

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a provider failure, keeping the whole context chain in the message.
    pub fn generation(err: anyhow::Error) -> Self {
        Error::Generation(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
