//! Fetch error types.

use thiserror::Error;

use super::ParseError;

/// Failure of a search or image fetch.
///
/// Cloneable so one download outcome can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("network error: {message}")]
    Transport { message: String },

    #[error("malformed search response: {reason}")]
    MalformedResponse { reason: String },

    #[error("failed to decode image: {reason}")]
    DecodeFailure { reason: String },

    #[error("invalid request URL: {url}")]
    InvalidUrl { url: String },

    #[error("fetch cancelled: {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// Creates transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            reason: reason.into(),
        }
    }

    /// Creates invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates cancelled error.
    #[must_use]
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns whether the error came from the network layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Cancelled { .. })
    }
}

impl From<ParseError> for FetchError {
    fn from(err: ParseError) -> Self {
        Self::MalformedResponse {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_maps_to_malformed_response() {
        let err: FetchError = ParseError::MalformedEnvelope.into();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_transport_is_recoverable() {
        let err = FetchError::transport("connection reset");
        assert!(err.is_transport());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "network error: connection reset");
    }
}
