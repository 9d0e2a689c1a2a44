use std::{fmt, io};

use http::StatusCode;

/// An extension trait to help determine if a given HTTP status is worth
/// retrying when no explicit set of retryable statuses is configured.
///
/// Inspired by `Retryable` from
/// [reqwest-middleware](https://github.com/TrueLayer/reqwest-middleware/blob/f854725791ccf4a02c401a26cab3d9db753f468c/reqwest-retry/src/retryable.rs)
pub(crate) trait RetryExt {
    fn should_retry(&self) -> bool;
}

impl RetryExt for StatusCode {
    fn should_retry(&self) -> bool {
        self.is_server_error() || *self == StatusCode::TOO_MANY_REQUESTS
    }
}

/// Coarse classification of a failed transport call.
///
/// Every kind is retried; the distinction exists for logging and for
/// callers inspecting [`super::AttemptOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or connection timed out
    Timeout,
    /// No connection could be established, e.g. DNS failure or refused
    /// connection
    Connect,
    /// The connection was reset or aborted mid-flight
    Interrupted,
    /// The response body could not be read
    Body,
    /// Any other failure of the transport
    Other,
}

impl From<&reqwest::Error> for TransportErrorKind {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if get_source_error_type::<io::Error>(error).is_some_and(is_interrupted) {
            Self::Interrupted
        } else if error.is_body() || error.is_decode() {
            Self::Body
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connection failure",
            Self::Interrupted => "connection interrupted",
            Self::Body => "body read failure",
            Self::Other => "transport failure",
        };
        f.write_str(name)
    }
}

/// Whether the connection was cut by the peer
fn is_interrupted(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

/// Downcasts the given err source into T.
fn get_source_error_type<T: std::error::Error + 'static>(
    err: &dyn std::error::Error,
) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(typed) = err.downcast_ref::<T>() {
            return Some(typed);
        }
        source = err.source();
    }
    None
}
