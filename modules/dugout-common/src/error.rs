use thiserror::Error;

#[derive(Error, Debug)]
pub enum DugoutError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
