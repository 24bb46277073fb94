//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ImageSource, ImageStatus, LoadedImage, PageResult, Photo};
pub use errors::{FetchError, FetchResult, ParseError};
pub use ports::{HttpTransport, ImageCachePort, PhotoSearchPort};
