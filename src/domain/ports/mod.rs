mod http_transport_port;
mod image_cache_port;
mod photo_search_port;

pub use http_transport_port::HttpTransport;
pub use image_cache_port::ImageCachePort;
pub use photo_search_port::PhotoSearchPort;
