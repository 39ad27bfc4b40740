//! Provider error types.

use thiserror::Error;

/// Errors that can occur when fetching a question bank.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No bank exists for the requested topic.
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    /// The topic cannot name a bank: it is empty or contains a path separator
    /// or `..`.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    /// The bank server returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The bank was fetched but could not be decoded.
    #[error("invalid bank from {source_name}: {reason}")]
    InvalidBank { source_name: String, reason: String },
}

/// Reject topics that would escape a bank root or URL path segment.
pub(crate) fn check_topic(topic: &str) -> Result<(), ProviderError> {
    if topic.trim().is_empty() || topic.contains(['/', '\\']) || topic.contains("..") {
        return Err(ProviderError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names() {
        assert!(check_topic("bali").is_ok());
        assert!(check_topic("java-heritage.v2").is_ok());
        for bad in ["", "  ", "../secrets", "banks/bali", "..", r"a\b", "bali..old"] {
            assert!(
                matches!(check_topic(bad), Err(ProviderError::InvalidTopic(_))),
                "accepted {bad:?}"
            );
        }
    }
}
