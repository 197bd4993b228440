//! Error types for ethphish

/// Result type alias using ethphish's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ethphish operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A serialized record did not match its declared schema
    #[error("decode error: {0}")]
    Decode(String),

    /// Input data errors (vocabulary, phisher list, record files)
    #[error("data error: {0}")]
    Data(String),

    /// Model construction or forward pass errors
    #[error("model error: {0}")]
    Model(String),

    /// Checkpoint save/load errors
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Metric computation errors (e.g. ROC with a single class)
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tensor library errors
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl Error {
    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new checkpoint error
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    /// Create a new metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
