use thiserror::Error;

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Errors raised while building or drawing from a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Batch size, train ratio or label threshold leave nothing to train on.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A label was looked up that is not part of the label index.
    #[error("Unknown label: '{0}'")]
    UnknownLabel(String),

    /// A batch was requested from a partition that holds no complete batch.
    #[error("The {0} partition holds no complete batch")]
    EmptyPartition(&'static str),

    /// Failure from the tabular loader, passed through untouched.
    #[error(transparent)]
    SourceLoad(#[from] anyhow::Error),
}

impl DatasetError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        DatasetError::Configuration(msg.into())
    }
}
