use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use reqwest::RequestBuilder;
use serde_json::Value;

/// Per-request parameters passed through to the transport unmodified.
///
/// The options are re-applied on every attempt, so a retried request is
/// identical to the first one.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers added to this request on top of the client defaults
    pub headers: HeaderMap,
    /// Query pairs appended to the URL
    pub query: Vec<(String, String)>,
    /// Raw request body
    pub body: Option<Vec<u8>>,
    /// JSON request body. Takes precedence over [`RequestOptions::body`].
    pub json: Option<Value>,
    /// Timeout for this request only
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Add a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append a query pair
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Set a timeout for this request
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if !self.headers.is_empty() {
            builder = builder.headers(self.headers.clone());
        }
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(json) = &self.json {
            builder = builder.json(json);
        } else if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, header};
    use serde_json::json;

    #[test]
    fn test_apply_options() {
        let options = RequestOptions::default()
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .query("page", "2")
            .json(json!({"name": "wizz"}));

        let request = options
            .apply(reqwest::Client::new().request(Method::POST, "https://example.com/items"))
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "https://example.com/items?page=2");
        assert_eq!(request.headers()[header::ACCEPT], "application/json");
        assert_eq!(
            request.body().and_then(reqwest::Body::as_bytes),
            Some(br#"{"name":"wizz"}"#.as_slice())
        );
    }

    #[test]
    fn test_default_options_leave_request_untouched() {
        let request = RequestOptions::default()
            .apply(reqwest::Client::new().get("https://example.com/"))
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "https://example.com/");
        assert!(request.headers().is_empty());
        assert!(request.body().is_none());
    }
}
