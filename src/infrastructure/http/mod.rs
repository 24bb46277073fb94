//! HTTP transport adapter.

mod reqwest_transport;

pub use reqwest_transport::{DEFAULT_TIMEOUT_SECS, ReqwestTransport};
