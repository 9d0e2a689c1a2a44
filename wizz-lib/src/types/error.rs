use http::StatusCode;
use thiserror::Error;
use url::Url;

/// Possible errors when interacting with `wizz_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A configured request rate is zero, negative, not finite, or too large
    /// to be expressed as a replenish interval
    #[error("Invalid request rate {rate} for {scope}: expected a positive number of requests per second")]
    InvalidRate {
        /// The host the rate was configured for, or `default`
        scope: String,
        /// The offending rate
        rate: f64,
    },

    /// A configured burst size is zero
    #[error("Invalid burst size for {0}: at least one request must be admitted at once")]
    InvalidBurstSize(String),

    /// The initial retry delay is zero
    #[error("The initial retry delay must be greater than zero")]
    InvalidRetryDelay,

    /// A configured retryable status code is outside of 100..=999
    #[error("Invalid retryable status code {0}")]
    InvalidStatusCode(u16),

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The proxy URL was rejected by the HTTP client
    #[error("Invalid proxy `{0}`")]
    InvalidProxy(String, #[source] reqwest::Error),

    /// The HTTP client could not be created
    #[error("Failed to create the HTTP client")]
    BuildRequestClient(#[source] reqwest::Error),

    /// A request could not be assembled from the given options
    #[error("Failed to build request")]
    BuildRequest(#[source] reqwest::Error),

    /// Network error while sending a request or reading its response
    #[error("Network error")]
    NetworkRequest(#[source] reqwest::Error),

    /// The given string can not be parsed into a valid URL
    #[error("Cannot parse `{0}` as website URL: {1}")]
    ParseUrl(String, url::ParseError),

    /// Every attempt was answered with a status that warranted a retry
    #[error("Giving up on {url} after {attempts} attempts (last status: {status})")]
    RetriesExhausted {
        /// The requested URL
        url: Url,
        /// Number of attempts made
        attempts: u32,
        /// Status of the final response
        status: StatusCode,
    },

    /// The async runtime for blocking calls could not be started
    #[error("Cannot start the async runtime")]
    Runtime(#[source] std::io::Error),

    /// The operation was cancelled before all requests completed
    #[error("Operation was cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Return the underlying `reqwest` error, if any
    #[must_use]
    pub const fn reqwest_error(&self) -> Option<&reqwest::Error> {
        match self {
            Self::InvalidProxy(_, e)
            | Self::BuildRequestClient(e)
            | Self::BuildRequest(e)
            | Self::NetworkRequest(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this error stems from invalid configuration.
    ///
    /// Configuration errors surface when a client is built and are never
    /// retried.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRate { .. }
                | Self::InvalidBurstSize(_)
                | Self::InvalidRetryDelay
                | Self::InvalidStatusCode(_)
                | Self::InvalidHeader(_)
                | Self::InvalidProxy(..)
                | Self::BuildRequestClient(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorKind;

    #[test]
    fn test_configuration_errors() {
        assert!(
            ErrorKind::InvalidRate {
                scope: "default".into(),
                rate: 0.0
            }
            .is_configuration()
        );
        assert!(ErrorKind::InvalidBurstSize("example.com".into()).is_configuration());
        assert!(!ErrorKind::Cancelled.is_configuration());
    }

    #[test]
    fn test_error_messages() {
        let error = ErrorKind::InvalidRate {
            scope: "api.example.com".into(),
            rate: -1.0,
        };
        assert_eq!(
            error.to_string(),
            "Invalid request rate -1 for api.example.com: expected a positive number of requests per second"
        );
    }
}
