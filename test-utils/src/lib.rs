//! `test-utils` is used for testing in both `wizz-lib` and `wizz-bin`.
//! This crate does not depend on `wizz-lib` or `wizz-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status to
/// every request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new($status);
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::any()).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Create a mock web server which answers the first `$times` requests with
/// the `$first` template and every later request with `$then`
#[macro_export]
macro_rules! flaky_mock_server {
    ($first:expr, $times:expr, $then:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with($first)
            .up_to_n_times($times)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with($then)
            .with_priority(2)
            .mount(&mock_server)
            .await;
        mock_server
    }};
}

/// Build the URL of `$path` on a running mock server
///
/// # Panic
///
/// This panics on error, so it should only be used for testing
#[macro_export]
macro_rules! mock_url {
    ($server:expr, $path:expr) => {
        url::Url::parse(&format!("{}{}", $server.uri(), $path)).expect("Expected valid mock URL")
    };
}
