pub mod http_fetcher;
pub mod png_file_sink;

pub use http_fetcher::{FetchError, MediaFetcher};
pub use png_file_sink::PngFileSink;
