use thiserror::Error;

/// Top-level error type for Parrot.
///
/// Subsystem crates define their own error types and implement
/// `From<ParrotError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParrotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported data source type: {0}")]
    UnsupportedDataSource(String),

    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("Index {index} out of range for conversation of {len} messages")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{0} is not initialized")]
    NotInitialized(String),
}

impl From<toml::de::Error> for ParrotError {
    fn from(err: toml::de::Error) -> Self {
        ParrotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ParrotError {
    fn from(err: toml::ser::Error) -> Self {
        ParrotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ParrotError {
    fn from(err: serde_json::Error) -> Self {
        ParrotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Parrot operations.
pub type Result<T> = std::result::Result<T, ParrotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParrotError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(ParrotError, &str)> = vec![
            (
                ParrotError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                ParrotError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (
                ParrotError::UnsupportedDataSource("excel".to_string()),
                "Unsupported data source type: excel",
            ),
            (
                ParrotError::UnsupportedProvider("acme".to_string()),
                "Unsupported model provider: acme",
            ),
            (
                ParrotError::IndexOutOfRange { index: 5, len: 2 },
                "Index 5 out of range for conversation of 2 messages",
            ),
            (
                ParrotError::NotInitialized("Agent".to_string()),
                "Agent is not initialized",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ParrotError = io_err.into();
        assert!(matches!(err, ParrotError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let parrot_err: ParrotError = err.unwrap_err().into();
        assert!(matches!(parrot_err, ParrotError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let parrot_err: ParrotError = err.unwrap_err().into();
        assert!(matches!(parrot_err, ParrotError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
