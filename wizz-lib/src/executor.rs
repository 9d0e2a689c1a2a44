use std::sync::Arc;
use std::time::Duration;

use http::Method;
use reqwest::Response;
use url::Url;

use crate::ratelimit::BucketRegistry;
use crate::retry::{AttemptOutcome, Decision, RetryPolicy, TransportErrorKind};
use crate::{Content, ErrorKind, FetchResult, RequestOptions, ResponseHead, Result};

/// A response as seen by the retry loop
struct Received<T> {
    head: ResponseHead,
    /// Decoded body, if the caller asked for one
    content: Option<Content>,
    /// What the caller keeps once the response is accepted
    accepted: T,
}

/// Waits shorter than this are not worth a log line
const NOTABLE_WAIT: Duration = Duration::from_millis(1);

/// Performs a single rate-limited, retried request.
///
/// Every attempt first takes a permit from the bucket governing the target
/// host, then calls the transport, then asks the [`RetryPolicy`] what to do
/// with the outcome. Retries are paced by the bucket as well, so they count
/// against the host's rate like any other request.
#[derive(Debug)]
pub struct RequestExecutor {
    client: reqwest::Client,
    registry: Arc<BucketRegistry>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor on top of an HTTP client.
    ///
    /// `reqwest::Client` is reference-counted: cloning it shares its
    /// connection pool, and the pool is released when the last clone is
    /// dropped. An executor never tears down a client it was handed.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        registry: Arc<BucketRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            registry,
            policy,
        }
    }

    /// Fetch `url` with a `GET` request and decode the body.
    ///
    /// Returns `None` if `url` is invalid, the body could not be decoded,
    /// every attempt failed, or retries were exhausted. Details are logged.
    pub async fn execute(&self, url: &str) -> FetchResult {
        match Url::parse(url) {
            Ok(url) => {
                self.fetch(Method::GET, &url, &RequestOptions::default())
                    .await
            }
            Err(e) => {
                log::error!("{}", ErrorKind::ParseUrl(url.to_string(), e));
                None
            }
        }
    }

    /// Send a request and decode the body of the accepted response.
    ///
    /// The decoded body is what a [`crate::ShouldRetry`] predicate gets to
    /// see. See [`RequestExecutor::execute`] for when this returns `None`.
    pub async fn fetch(&self, method: Method, url: &Url, options: &RequestOptions) -> FetchResult {
        let decoded = self
            .run(&method, url, options, |response| async move {
                let head = ResponseHead::from(&response);
                Received {
                    head,
                    content: Content::from_response(response).await,
                    accepted: (),
                }
            })
            .await;

        match decoded {
            Ok(received) => received.content,
            Err(ErrorKind::BuildRequest(e)) => {
                log::error!("Failed to build request for {url}: {e}");
                None
            }
            // Already logged when giving up
            Err(_) => None,
        }
    }

    /// Send a request and return the accepted response without reading its
    /// body.
    ///
    /// Retry decisions see the status and headers only, so a
    /// [`crate::ShouldRetry`] predicate receives no content.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BuildRequest`] if the request could not be
    /// assembled, [`ErrorKind::NetworkRequest`] if the final attempt failed
    /// without a response, and [`ErrorKind::RetriesExhausted`] if the final
    /// response still warranted a retry.
    pub async fn send(
        &self,
        method: Method,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<Response> {
        let received = self
            .run(&method, url, options, |response| async move {
                Received {
                    head: ResponseHead::from(&response),
                    content: None,
                    accepted: response,
                }
            })
            .await?;
        Ok(received.accepted)
    }

    /// The policy deciding about retries
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The buckets pacing requests
    #[must_use]
    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Take a permit for `url`, then perform one transport call
    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        options: &RequestOptions,
    ) -> reqwest::Result<Response> {
        let waited = self.registry.resolve(url).acquire().await;
        if waited >= NOTABLE_WAIT {
            log::debug!("Waited {waited:?} for a permit to request {url}");
        }

        let request = options.apply(self.client.request(method.clone(), url.clone()));
        request.send().await
    }

    /// Attempt, decide and pause until the policy accepts a response or
    /// gives up.
    ///
    /// `receive` turns every response into what the policy inspects and
    /// what the caller gets back once the response is accepted.
    async fn run<T, F, Fut>(
        &self,
        method: &Method,
        url: &Url,
        options: &RequestOptions,
        receive: F,
    ) -> Result<Received<T>>
    where
        F: Fn(Response) -> Fut,
        Fut: Future<Output = Received<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (decision, last, reason) = match self.attempt(method, url, options).await {
                Ok(response) => {
                    let received = receive(response).await;
                    let outcome = AttemptOutcome::Success {
                        head: &received.head,
                        content: received.content.as_ref(),
                    };
                    let decision = self.policy.decide(&outcome, attempt);
                    let reason = received.head.status.to_string();
                    (decision, Ok(received), reason)
                }
                Err(e) if e.is_builder() => return Err(ErrorKind::BuildRequest(e)),
                Err(e) => {
                    let kind = TransportErrorKind::from(&e);
                    let decision = self
                        .policy
                        .decide(&AttemptOutcome::TransportFailure(kind), attempt);
                    let reason = format!("{kind}: {e}");
                    (decision, Err(e), reason)
                }
            };

            match decision {
                Decision::Proceed => return last.map_err(ErrorKind::NetworkRequest),
                Decision::RetryAfter(delay) => self.pause(url, attempt, delay, &reason).await,
                Decision::GiveUp => {
                    log_give_up(url, attempt, &reason);
                    return Err(match last {
                        Ok(received) => ErrorKind::RetriesExhausted {
                            url: url.clone(),
                            attempts: attempt,
                            status: received.head.status,
                        },
                        Err(e) => ErrorKind::NetworkRequest(e),
                    });
                }
            }
        }
    }

    async fn pause(&self, url: &Url, attempt: u32, delay: Duration, reason: &str) {
        log::warn!(
            "Attempt {attempt}/{} for {url} failed ({reason}), retrying in {delay:?}",
            self.policy.max_attempts()
        );
        tokio::time::sleep(delay).await;
    }
}

fn log_give_up(url: &Url, attempts: u32, reason: &str) {
    log::error!("Giving up on {url} after {attempts} attempts ({reason})");
}
