//! Flickr search API adapter.

mod endpoint;
pub mod parser;

pub use endpoint::{DEFAULT_PER_PAGE, FLICKR_API_BASE, SEARCH_METHOD, SearchEndpoint};
pub use parser::{parse_search_bytes, parse_search_response};
