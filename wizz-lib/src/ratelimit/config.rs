use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default number of requests per second, shared by all hosts without an override
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;

/// Default number of requests admitted at once before pacing applies
pub const DEFAULT_BURST_SIZE: u32 = 1;

/// Global rate limiting configuration.
///
/// `requests_per_second` and `burst_size` govern the default bucket, which
/// serves every host without an entry in `hosts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Steady-state request rate of the default bucket
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Capacity of the default bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Per-host overrides, keyed by hostname or `hostname:port`
    #[serde(default)]
    pub hosts: HostConfigs,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            hosts: HostConfigs::new(),
        }
    }
}

const fn default_requests_per_second() -> f64 {
    DEFAULT_REQUESTS_PER_SECOND
}

const fn default_burst_size() -> u32 {
    DEFAULT_BURST_SIZE
}

/// Per-host configuration overrides
pub type HostConfigs = HashMap<String, HostConfig>;

/// Rate limit for a specific host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Steady-state request rate for this host
    pub requests_per_second: f64,

    /// Capacity of this host's bucket
    #[serde(default)]
    pub burst_size: Option<u32>,
}

impl HostConfig {
    /// Get the effective burst size, falling back to the global default
    #[must_use]
    pub fn effective_burst_size(&self, global_config: &RateLimitConfig) -> u32 {
        self.burst_size.unwrap_or(global_config.burst_size)
    }
}

impl From<f64> for HostConfig {
    fn from(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            burst_size: None,
        }
    }
}
