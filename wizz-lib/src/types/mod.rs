#![allow(unreachable_pub)]

mod error;
mod options;
mod response;

pub use error::ErrorKind;
pub use options::RequestOptions;
pub use response::{Content, ResponseHead};

/// The wizz `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;

/// Final value for a single URL.
///
/// `None` if the URL could not be fetched, retries were exhausted, or the
/// body could not be decoded.
pub type FetchResult = Option<Content>;
