use thiserror::Error;

#[derive(Error, Debug)]
pub enum EbtelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed event: {0}")]
    Decode(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Aggregator task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, EbtelError>;
