use thiserror::Error;

/// Errors that can occur when loading point clouds or camera descriptions.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("missing required property '{0}'")]
    MissingProperty(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoadError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        LoadError::InvalidFormat(msg.into())
    }
}
