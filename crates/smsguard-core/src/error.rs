//! Error types for SMS Guard

/// Result type alias using SMS Guard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SMS Guard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Word model loading or persistence errors
    #[error("model error: {0}")]
    Model(String),

    /// Inference backend errors
    #[error("inference error: {0}")]
    Inference(String),

    /// Malformed transport segment metadata
    #[error("malformed segment: {0}")]
    MalformedSegment(String),

    /// Message store errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new malformed segment error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSegment(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_build_matching_variants() {
        assert!(matches!(Error::storage("disk full"), Error::Storage(_)));
        assert_eq!(
            Error::config("bad capacity").to_string(),
            "configuration error: bad capacity"
        );
    }

    #[test]
    fn test_from_conversions() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, Error::Io(_)));

        let json: Error = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(json, Error::Serialization(_)));
    }
}
