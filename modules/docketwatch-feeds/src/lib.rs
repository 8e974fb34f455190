pub mod error;
pub mod http;
pub mod parse;
pub mod source;

pub use error::{FeedError, Result};
pub use http::HttpFeedSource;
pub use parse::parse_feed;
pub use source::FeedSource;
