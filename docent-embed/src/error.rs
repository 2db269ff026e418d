//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Every variant means the same thing to a caller: embeddings are unavailable
/// for the current build or query. The variants keep the cause apart so it can
/// be logged and surfaced precisely.
///
/// # Error Categories
///
/// - **Configuration Errors**: Missing API key or invalid settings
/// - **Transport Errors**: Network failures and timeouts
/// - **Provider Errors**: Non-success HTTP status from the embedding service
/// - **Response Errors**: Payloads that cannot be parsed or do not line up with the request
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Live mode was selected but no API key is configured
    #[error("Embedding API key is not set")]
    MissingApiKey,

    /// Error when the embedding configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The embedding request did not complete within the configured timeout
    #[error("Embedding request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Transport-level failure talking to the embedding service
    #[error("Embedding request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    /// The embedding service answered with a non-success status
    #[error("Embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded
    #[error("Malformed embedding response: {message}")]
    MalformedResponse { message: String },

    /// The service returned a different number of vectors than texts sent
    #[error("Embedding count mismatch: sent {expected} texts, received {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    /// A vector does not have the dimension established for this provider
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    ///
    /// # Arguments
    /// * `message` - A descriptive error message explaining what's wrong with the configuration
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed response error with a custom message.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Classify a transport error, separating timeouts from other failures.
    ///
    /// # Arguments
    /// * `source` - The error returned by the HTTP client
    /// * `timeout_secs` - The timeout the client was configured with, for reporting
    pub fn from_transport(source: reqwest::Error, timeout_secs: u64) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                seconds: timeout_secs,
            }
        } else if source.is_decode() {
            Self::MalformedResponse {
                message: source.to_string(),
            }
        } else {
            Self::Request { source }
        }
    }

    /// True when retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Request { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EmbedError::Timeout { seconds: 30 }.is_transient());
        assert!(
            EmbedError::Api {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            EmbedError::Api {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !EmbedError::Api {
                status: 401,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!EmbedError::MissingApiKey.is_transient());
        assert!(
            !EmbedError::CountMismatch {
                expected: 2,
                actual: 1
            }
            .is_transient()
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EmbedError::CountMismatch {
                expected: 3,
                actual: 2
            }
            .to_string(),
            "Embedding count mismatch: sent 3 texts, received 2 vectors"
        );
        assert_eq!(
            EmbedError::invalid_config("batch size must be positive").to_string(),
            "Invalid embedding configuration: batch size must be positive"
        );
    }
}
