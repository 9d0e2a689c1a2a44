//! Per-host request pacing.
//!
//! Every outgoing request first takes a token from the bucket governing its
//! host. Hosts with an entry in [`RateLimitConfig::hosts`] get a dedicated
//! bucket; all other hosts share a single default bucket.
//!
//! # Architecture
//!
//! - [`TokenBucket`]: Admission control with a refill rate and a burst size
//! - [`BucketRegistry`]: Routes a URL to the bucket for its host
//! - [`HostKey`]: Normalized hostname used for lookups
//! - [`RateLimitConfig`], [`HostConfig`]: Configuration for all of the above

mod bucket;
mod config;
mod key;
mod registry;

pub use bucket::TokenBucket;
pub use config::{
    DEFAULT_BURST_SIZE, DEFAULT_REQUESTS_PER_SECOND, HostConfig, HostConfigs, RateLimitConfig,
};
pub use key::HostKey;
pub use registry::BucketRegistry;
