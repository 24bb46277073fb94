//! Domain error types.

mod fetch_error;
mod parse_error;

pub use fetch_error::FetchError;
pub use parse_error::ParseError;

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
