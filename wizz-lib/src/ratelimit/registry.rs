use std::collections::HashMap;
use url::Url;

use crate::Result;
use crate::ratelimit::{HostKey, RateLimitConfig, TokenBucket};

/// Maps hosts to the bucket that governs their requests.
///
/// The set of buckets is fixed at construction: one per configured host
/// plus a shared default bucket for every other host. Lookups therefore
/// need no locking, and the registry can be shared freely behind an `Arc`.
///
/// # Examples
///
/// ```
/// use wizz_lib::ratelimit::{BucketRegistry, HostConfig, RateLimitConfig};
/// use url::Url;
///
/// let mut config = RateLimitConfig::default();
/// config.hosts.insert("api.example.com".into(), HostConfig::from(2.0));
/// let registry = BucketRegistry::new(&config).unwrap();
///
/// let url = Url::parse("https://api.example.com/items").unwrap();
/// assert_eq!(registry.resolve(&url).requests_per_second(), 2.0);
/// ```
#[derive(Debug)]
pub struct BucketRegistry {
    /// Dedicated buckets for configured hosts
    buckets: HashMap<HostKey, TokenBucket>,

    /// Shared bucket for all hosts without an override
    default: TokenBucket,
}

impl BucketRegistry {
    /// Create all buckets named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default or any per-host rate or burst size is
    /// invalid. Nothing is partially constructed in that case.
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let default = TokenBucket::new("default", config.requests_per_second, config.burst_size)?;

        let buckets = config
            .hosts
            .iter()
            .map(|(host, host_config)| {
                let key = HostKey::from(host.as_str());
                let bucket = TokenBucket::new(
                    key.as_str(),
                    host_config.requests_per_second,
                    host_config.effective_burst_size(config),
                )?;
                Ok((key, bucket))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self { buckets, default })
    }

    /// Get the bucket governing requests to `url`.
    ///
    /// An entry for `host:port` wins over an entry for the bare host, which
    /// wins over the default bucket. URLs without a host use the default.
    #[must_use]
    pub fn resolve(&self, url: &Url) -> &TokenBucket {
        let Some(key) = HostKey::from_url(url) else {
            return &self.default;
        };

        url.port()
            .and_then(|port| self.buckets.get(&key.with_port(port)))
            .or_else(|| self.buckets.get(&key))
            .unwrap_or(&self.default)
    }

    /// The bucket shared by all hosts without an override
    #[must_use]
    pub const fn default_bucket(&self) -> &TokenBucket {
        &self.default
    }

    /// Number of hosts with a dedicated bucket
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.buckets.len()
    }
}
