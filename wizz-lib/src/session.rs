use std::sync::Arc;

use http::Method;
use reqwest::Response;
use url::Url;

use crate::{RequestExecutor, RequestOptions, Result};

/// Low-level access to the rate-limited transport.
///
/// Every verb runs through the same acquire, call and retry pipeline as
/// [`crate::Client::fetch`], but hands back the accepted
/// [`reqwest::Response`] instead of a decoded body. The response owns its
/// connection until it is dropped or its body is consumed.
///
/// Sessions are cheap to clone and share their buckets with the
/// [`crate::Client`] they came from.
#[derive(Debug, Clone)]
pub struct RateLimitedSession {
    executor: Arc<RequestExecutor>,
}

impl RateLimitedSession {
    pub(crate) const fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Send a request with an arbitrary method.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn request(
        &self,
        method: Method,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<Response> {
        self.executor.send(method, url, options).await
    }

    /// Send a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn get(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::GET, url, options).await
    }

    /// Send a `POST` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn post(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::POST, url, options).await
    }

    /// Send a `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn put(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::PUT, url, options).await
    }

    /// Send a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn delete(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, url, options).await
    }

    /// Send a `PATCH` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn patch(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::PATCH, url, options).await
    }

    /// Send a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn head(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::HEAD, url, options).await
    }

    /// Send an `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::send`].
    pub async fn options(&self, url: &Url, options: &RequestOptions) -> Result<Response> {
        self.request(Method::OPTIONS, url, options).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClientBuilder, RequestOptions};
    use http::{Method, StatusCode};
    use rstest::rstest;
    use std::time::Duration;
    use test_utils::{flaky_mock_server, mock_url};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[rstest]
    #[case(Method::GET)]
    #[case(Method::POST)]
    #[case(Method::PUT)]
    #[case(Method::DELETE)]
    #[case(Method::PATCH)]
    #[case(Method::HEAD)]
    #[case(Method::OPTIONS)]
    #[tokio::test]
    async fn test_verbs(#[case] verb: Method) {
        let mock_server = MockServer::start().await;
        Mock::given(method(verb.as_str()))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(StatusCode::NO_CONTENT))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = ClientBuilder::default().session().unwrap();
        let url = mock_url!(mock_server, "/resource");
        let options = RequestOptions::default();

        let response = match verb.as_str() {
            "GET" => session.get(&url, &options).await,
            "POST" => session.post(&url, &options).await,
            "PUT" => session.put(&url, &options).await,
            "DELETE" => session.delete(&url, &options).await,
            "PATCH" => session.patch(&url, &options).await,
            "HEAD" => session.head(&url, &options).await,
            _ => session.options(&url, &options).await,
        }
        .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_session_retries() {
        let mock_server = flaky_mock_server!(
            ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS),
            1,
            ResponseTemplate::new(StatusCode::OK).set_body_string("fine"),
        );

        let session = ClientBuilder::builder()
            .initial_retry_delay(Duration::from_millis(10))
            .build()
            .session()
            .unwrap();
        let response = session
            .request(
                Method::GET,
                &mock_url!(mock_server, "/"),
                &RequestOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_session_shares_external_client() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::OK))
            .expect(2)
            .mount(&mock_server)
            .await;

        let external = reqwest::Client::new();
        let session = ClientBuilder::builder()
            .reqwest_client(external.clone())
            .build()
            .session()
            .unwrap();
        let url = mock_url!(mock_server, "/");

        session.get(&url, &RequestOptions::default()).await.unwrap();
        drop(session);

        // The caller's client outlives the session
        let response = external.get(url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
