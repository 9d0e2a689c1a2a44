use crate::options::{Config, HeaderMapExt};
use anyhow::{Context, Result};
use http::HeaderMap;
use std::collections::HashSet;
use wizz_lib::{Client, ClientBuilder};

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    builder(cfg)?
        .client()
        .context("Failed to create client")
}

/// Translate the command-line config into a [`ClientBuilder`]
fn builder(cfg: &Config) -> Result<ClientBuilder> {
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;

    // No `--retry-status` means the default set of retryable statuses
    let retry_statuses = (!cfg.retry_status.is_empty())
        .then(|| cfg.retry_status.iter().copied().collect::<HashSet<_>>());

    Ok(ClientBuilder::builder()
        .requests_per_second(cfg.requests_per_second)
        .burst_size(cfg.burst_size)
        .domain_limits(cfg.hosts.clone())
        .max_retries(cfg.max_retries)
        .initial_retry_delay(cfg.retry_wait_time)
        .exponential_backoff(!cfg.no_exponential_backoff)
        .retry_statuses(retry_statuses)
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.timeout)
        .custom_headers(headers)
        .proxy(cfg.proxy.clone())
        .allow_insecure(cfg.insecure)
        .build())
}
