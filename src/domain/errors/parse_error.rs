//! Search response parsing errors.

use thiserror::Error;

/// Failure to turn a search response into a page of photos.
///
/// Individual malformed photo records never produce this error; they are
/// dropped from the page instead.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response has no photos envelope")]
    MalformedEnvelope,

    #[error("response is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("search service returned error {code}: {message}")]
    Service { code: i64, message: String },
}

impl ParseError {
    /// Creates invalid JSON error.
    #[must_use]
    pub fn invalid_json(reason: impl Into<String>) -> Self {
        Self::InvalidJson {
            reason: reason.into(),
        }
    }
}
