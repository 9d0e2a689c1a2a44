//! Rate-limited fetching of many URLs.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` fetches URLs concurrently and returns their decoded bodies in
//! input order. `ClientBuilder` exposes a finer level of granularity for
//! building a `Client`.
//!
//! For callers outside of an async context, a free function
//! [`fetch_many`] is provided.
#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use http::Method;
use http::header::{self, HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;
use url::Url;

use crate::ratelimit::{
    BucketRegistry, DEFAULT_BURST_SIZE, DEFAULT_REQUESTS_PER_SECOND, HostConfigs, RateLimitConfig,
};
use crate::retry::{
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, RetryConfig, RetryPolicy, ShouldRetry,
};
use crate::{
    ErrorKind, FetchResult, RateLimitedSession, RequestExecutor, RequestOptions, Result,
};

/// Default user agent, `wizz/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("wizz/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Steady-state request rate for all hosts without an entry in
    /// [`ClientBuilder::domain_limits`].
    ///
    /// Fractional rates are allowed, e.g. `0.5` for one request every two
    /// seconds.
    #[builder(default = DEFAULT_REQUESTS_PER_SECOND)]
    requests_per_second: f64,

    /// Number of requests admitted at once before pacing applies.
    #[builder(default = DEFAULT_BURST_SIZE)]
    burst_size: u32,

    /// Per-host rate limits, keyed by hostname or `hostname:port`.
    ///
    /// Every configured host gets its own bucket and does not count against
    /// the shared default rate.
    domain_limits: HostConfigs,

    /// Maximum number of retries per request before giving up.
    #[builder(default = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Delay before the first retry.
    ///
    /// Doubles with every retry if
    /// [`ClientBuilder::exponential_backoff`] is set. A `Retry-After` header
    /// on a retryable response takes precedence.
    #[builder(default = DEFAULT_INITIAL_DELAY)]
    initial_retry_delay: Duration,

    /// Double the retry delay after every retry.
    #[builder(default = true)]
    exponential_backoff: bool,

    /// Statuses that warrant a retry.
    ///
    /// Defaults to 429 and all 5xx statuses. Any other status is accepted
    /// as final.
    retry_statuses: Option<HashSet<u16>>,

    /// Forces a retry of responses that would otherwise be accepted.
    should_retry: Option<ShouldRetry>,

    /// User-agent used for all requests.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Response timeout per request.
    timeout: Option<Duration>,

    /// Sets the default [headers] for every request.
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    custom_headers: HeaderMap,

    /// Proxy URL all requests are sent through.
    proxy: Option<String>,

    /// When `true`, accept invalid SSL certificates.
    ///
    /// ## Warning
    ///
    /// You should think very carefully before using this method. If
    /// invalid certificates are trusted, any certificate for any site
    /// will be trusted for use. This includes expired certificates. This
    /// introduces significant vulnerabilities, and should only be used
    /// as a last resort.
    allow_insecure: bool,

    /// Use an existing HTTP client instead of creating one.
    ///
    /// The client is shared, not owned: it stays usable by the caller after
    /// the [`Client`] is dropped. [`ClientBuilder::user_agent`],
    /// [`ClientBuilder::timeout`], [`ClientBuilder::custom_headers`],
    /// [`ClientBuilder::proxy`] and [`ClientBuilder::allow_insecure`] are
    /// ignored in that case.
    reqwest_client: Option<reqwest::Client>,
}

impl Default for ClientBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - A request rate or burst size is invalid.
    /// - The retry delay is zero or a retryable status is invalid.
    /// - The user-agent or proxy is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let registry = BucketRegistry::new(&self.rate_limit_config())?;
        let policy = RetryPolicy::new(self.retry_config(), self.should_retry.clone())?;

        let reqwest_client = match self.reqwest_client {
            Some(client) => client,
            None => Self::build_reqwest_client(
                self.user_agent,
                self.custom_headers,
                self.timeout,
                self.proxy,
                self.allow_insecure,
            )?,
        };

        let executor = RequestExecutor::new(reqwest_client, Arc::new(registry), policy);
        Ok(Client {
            executor: Arc::new(executor),
        })
    }

    /// Instantiates a [`RateLimitedSession`] for low-level requests.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::client`].
    pub fn session(self) -> Result<RateLimitedSession> {
        self.client().map(|client| client.session())
    }

    /// The rate limits this builder describes
    #[must_use]
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: self.requests_per_second,
            burst_size: self.burst_size,
            hosts: self.domain_limits.clone(),
        }
    }

    /// The retry behavior this builder describes
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: self.initial_retry_delay,
            exponential_backoff: self.exponential_backoff,
            retry_statuses: self.retry_statuses.clone(),
        }
    }

    fn build_reqwest_client(
        user_agent: String,
        mut headers: HeaderMap,
        timeout: Option<Duration>,
        proxy: Option<String>,
        allow_insecure: bool,
    ) -> Result<reqwest::Client> {
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&user_agent)?);

        let mut builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(allow_insecure);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(&proxy).map_err(|e| ErrorKind::InvalidProxy(proxy, e))?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(ErrorKind::BuildRequestClient)
    }
}

/// Fetches URLs concurrently under per-host rate limits.
///
/// Cloning a `Client` is cheap; all clones share the same buckets and
/// connection pool.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
}

impl Client {
    /// Fetch a single URL with a `GET` request.
    ///
    /// Returns `None` if the URL is invalid, could not be fetched, retries
    /// were exhausted, or the body could not be decoded.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        self.executor.execute(url).await
    }

    /// Fetch a single URL with an arbitrary method and request options.
    ///
    /// See [`Client::fetch`] for when this returns `None`.
    pub async fn fetch_with(
        &self,
        method: Method,
        url: &Url,
        options: &RequestOptions,
    ) -> FetchResult {
        self.executor.fetch(method, url, options).await
    }

    /// Fetch all `urls` concurrently.
    ///
    /// The result has one entry per input URL, in input order, no matter
    /// in which order the requests complete. A failing URL yields `None` in
    /// its slot and never aborts the batch.
    pub async fn fetch_all<I, S>(&self, urls: I) -> Vec<FetchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch_all_with_progress(urls, |_| {}).await
    }

    /// Like [`Client::fetch_all`], calling `on_complete` with the input
    /// index of every URL as soon as it is done.
    pub async fn fetch_all_with_progress<I, S, F>(&self, urls: I, on_complete: F) -> Vec<FetchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(usize),
    {
        let on_complete = &on_complete;
        let requests = urls.into_iter().enumerate().map(|(index, url)| async move {
            let result = self.fetch(url.as_ref()).await;
            on_complete(index);
            result
        });

        join_all(requests).await
    }

    /// Like [`Client::fetch_all`], but stops as soon as `token` is
    /// cancelled.
    ///
    /// Cancellation drops all in-flight requests, including those waiting
    /// for a permit or sleeping before a retry.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`] if `token` was cancelled before all
    /// URLs were fetched.
    pub async fn fetch_all_cancellable<I, S>(
        &self,
        urls: I,
        token: &CancellationToken,
    ) -> Result<Vec<FetchResult>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(ErrorKind::Cancelled),
            results = self.fetch_all(urls) => Ok(results),
        }
    }

    /// A session sharing this client's buckets, for low-level requests
    #[must_use]
    pub fn session(&self) -> RateLimitedSession {
        RateLimitedSession::new(self.executor.clone())
    }

    /// The executor performing the requests of this client
    #[must_use]
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}

/// Fetch all `urls`, blocking until every result is available.
///
/// This provides the simplest way to fetch a batch of URLs without having
/// to create a [`Client`] or an async runtime.
///
/// # Errors
///
/// Returns an error if the builder holds an invalid configuration or the
/// async runtime cannot be started.
///
/// # Panics
///
/// Panics when called from within an async runtime.
pub fn fetch_many<I, S>(urls: I, builder: ClientBuilder) -> Result<Vec<FetchResult>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ErrorKind::Runtime)?;

    runtime.block_on(async {
        let client = builder.client()?;
        Ok(client.fetch_all(urls).await)
    })
}
