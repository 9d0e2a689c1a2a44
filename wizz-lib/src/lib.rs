//! `wizz` is a library for fetching many URLs at once without overwhelming
//! the servers behind them.
//!
//! Requests are paced per host by token buckets, transient failures are
//! retried with backoff, and `Retry-After` headers are honored.
//!
//! "Hello world" example:
//! ```no_run
//! use wizz_lib::{ClientBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::default().client()?;
//!   let results = client
//!       .fetch_all(["https://example.com", "https://example.org"])
//!       .await;
//!   for content in results.into_iter().flatten() {
//!       println!("{content}");
//!   }
//!   Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can configure the client yourself,
//! using the `ClientBuilder`:
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::time::Duration;
//! use wizz_lib::{ClientBuilder, Result, ShouldRetry, ratelimit::HostConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::builder()
//!       .requests_per_second(5.0)
//!       .burst_size(2u32)
//!       .domain_limits(HashMap::from([(
//!           "api.github.com".to_string(),
//!           HostConfig::from(1.0),
//!       )]))
//!       .max_retries(3u32)
//!       .initial_retry_delay(Duration::from_millis(500))
//!       .should_retry(ShouldRetry::new(|head, _content| {
//!           head.headers.contains_key("x-try-again")
//!       }))
//!       .build()
//!       .client()?;
//!
//!   let content = client.fetch("https://api.github.com/zen").await;
//!   println!("{content:?}");
//!   Ok(())
//! }
//! ```
//!
//! Outside of an async context, use [`fetch_many`]:
//!
//! ```no_run
//! use wizz_lib::{ClientBuilder, fetch_many};
//!
//! let results = fetch_many(["https://example.com"], ClientBuilder::default()).unwrap();
//! assert_eq!(results.len(), 1);
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod executor;
mod session;
mod types;

pub mod ratelimit;
pub mod retry;

pub use crate::{
    client::{Client, ClientBuilder, DEFAULT_USER_AGENT, fetch_many},
    executor::RequestExecutor,
    retry::{RetryConfig, RetryPolicy, ShouldRetry},
    session::RateLimitedSession,
    types::{Content, ErrorKind, FetchResult, RequestOptions, ResponseHead, Result},
};
