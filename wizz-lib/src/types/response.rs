use std::fmt::Display;

use http::{HeaderMap, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Status line and headers of a received response.
///
/// This is what retry decisions and caller-supplied predicates get to see.
/// The body is consumed separately, because [`reqwest::Response`] can only
/// be read once.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Final URL after redirects
    pub url: Url,
}

impl From<&reqwest::Response> for ResponseHead {
    fn from(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        }
    }
}

/// Decoded body of a response.
///
/// JSON bodies are parsed into a [`Value`], everything else is kept as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    /// Body of a response with a JSON content type
    Json(Value),
    /// Body of any other response
    Text(String),
}

impl Content {
    /// Decode the body of `response`.
    ///
    /// Returns `None` if the body could not be read or is not valid JSON
    /// despite announcing a JSON content type.
    pub(crate) async fn from_response(response: reqwest::Response) -> Option<Self> {
        let url = response.url().clone();
        let decoded = if is_json(response.headers()) {
            response.json::<Value>().await.map(Content::Json)
        } else {
            response.text().await.map(Content::Text)
        };

        match decoded {
            Ok(content) => Some(content),
            Err(e) => {
                log::error!("Failed to parse response from {url}: {e}");
                None
            }
        }
    }

    /// The parsed JSON value, if this is a JSON body
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Text(_) => None,
        }
    }

    /// The raw text, if this is a non-JSON body
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Json(_) => None,
            Content::Text(text) => Some(text),
        }
    }
}

impl Display for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Json(value) => write!(f, "{value}"),
            Content::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

/// Check the `Content-Type` header for `application/json` or a `+json` suffix
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| mime == "application/json" || mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("application/json", true)]
    #[case("application/json; charset=utf-8", true)]
    #[case("Application/JSON", true)]
    #[case("application/problem+json", true)]
    #[case("text/plain", false)]
    #[case("text/html; charset=utf-8", false)]
    fn test_is_json(#[case] content_type: &str, #[case] expected: bool) {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        assert_eq!(is_json(&headers), expected);
    }

    #[test]
    fn test_missing_content_type_is_text() {
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn test_content_accessors() {
        let json = Content::from(json!({"status": "ok"}));
        assert_eq!(json.as_json(), Some(&json!({"status": "ok"})));
        assert_eq!(json.as_text(), None);
        assert_eq!(json.to_string(), r#"{"status":"ok"}"#);

        let text = Content::from("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.as_json(), None);
    }

    #[test]
    fn test_content_serializes_untagged() {
        let content = Content::from(json!([1, 2]));
        assert_eq!(serde_json::to_string(&content).unwrap(), "[1,2]");
        let content = Content::from("plain");
        assert_eq!(serde_json::to_string(&content).unwrap(), r#""plain""#);
    }
}
