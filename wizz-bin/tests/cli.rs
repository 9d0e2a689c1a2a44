#[cfg(test)]
mod cli {
    use assert_cmd::cargo::cargo_bin_cmd;
    use http::StatusCode;
    use predicates::str::contains;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::{error::Error, fs};
    use tempfile::tempdir;
    use test_utils::mock_server;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    type Result<T> = std::result::Result<T, Box<dyn Error>>;

    /// Serve a JSON body on `/json` and a text body on `/text`
    async fn content_server() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_results_in_input_order() -> Result<()> {
        let mock_server = content_server().await;

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg(format!("{}/text", mock_server.uri()))
            .arg(format!("{}/json", mock_server.uri()))
            .arg(format!("{}/text", mock_server.uri()))
            .assert()
            .success()
            .stdout("hello\n{\"id\":1}\nhello\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_json_format() -> Result<()> {
        let mock_server = content_server().await;

        let output = cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--format")
            .arg("json")
            .arg(format!("{}/json", mock_server.uri()))
            .arg(format!("{}/text", mock_server.uri()))
            .output()?;

        assert!(output.status.success());
        let lines = String::from_utf8(output.stdout)?
            .lines()
            .map(serde_json::from_str)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        assert_eq!(lines, vec![json!({"id": 1}), json!("hello")]);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_url_keeps_its_slot() -> Result<()> {
        let ok_server = content_server().await;
        let failing_server = mock_server!(StatusCode::SERVICE_UNAVAILABLE);

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--max-retries")
            .arg("0")
            .arg("--format")
            .arg("json")
            .arg(format!("{}/json", ok_server.uri()))
            .arg(failing_server.uri())
            .arg(format!("{}/text", ok_server.uri()))
            .assert()
            .failure()
            .code(2)
            .stdout("{\"id\":1}\nnull\n\"hello\"\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_error() -> Result<()> {
        let mock_server = test_utils::flaky_mock_server!(
            ResponseTemplate::new(503),
            1,
            ResponseTemplate::new(200).set_body_string("recovered"),
        );

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--retry-wait-time")
            .arg("10ms")
            .arg(mock_server.uri())
            .assert()
            .success()
            .stdout("recovered\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() -> Result<()> {
        let mock_server = content_server().await;

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("not a url")
            .arg(format!("{}/text", mock_server.uri()))
            .assert()
            .code(2)
            .stdout("-\nhello\n")
            .stderr(contains("not a url"));

        Ok(())
    }

    #[tokio::test]
    async fn test_input_file() -> Result<()> {
        let mock_server = content_server().await;
        let dir = tempdir()?;
        let file_path = dir.path().join("urls.txt");
        fs::write(
            &file_path,
            format!(
                "# endpoints\n{uri}/json\n\n{uri}/text\n",
                uri = mock_server.uri()
            ),
        )?;

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--input-file")
            .arg(&file_path)
            .assert()
            .success()
            .stdout("{\"id\":1}\nhello\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_input_file_from_stdin() -> Result<()> {
        let mock_server = content_server().await;

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--input-file")
            .arg("-")
            .write_stdin(format!("{}/text\n", mock_server.uri()))
            .assert()
            .success()
            .stdout("hello\n");

        Ok(())
    }

    #[tokio::test]
    async fn test_config_file() -> Result<()> {
        let mock_server = mock_server!(StatusCode::OK, set_body_string("configured"));
        let dir = tempdir()?;
        let config_path = dir.path().join("wizz.toml");
        fs::write(
            &config_path,
            r#"
            format = "json"
            max_retries = 1
            retry_wait_time = "10ms"

            [hosts."127.0.0.1"]
            requests_per_second = 50.0
            burst_size = 5
            "#,
        )?;

        cargo_bin_cmd!()
            .arg("--no-progress")
            .arg("--config")
            .arg(&config_path)
            .arg(mock_server.uri())
            .assert()
            .success()
            .stdout("\"configured\"\n");

        Ok(())
    }

    #[test]
    fn test_invalid_config_file() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("wizz.toml");
        fs::write(&config_path, "concurrency = 4\n")?;

        cargo_bin_cmd!()
            .arg("--config")
            .arg(&config_path)
            .arg("https://example.com")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));

        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        cargo_bin_cmd!()
            .arg("--config")
            .arg("/definitely/not/here/wizz.toml")
            .arg("https://example.com")
            .assert()
            .failure()
            .code(3);
    }

    #[test]
    fn test_invalid_rate() {
        cargo_bin_cmd!()
            .arg("--rps")
            .arg("0")
            .arg("https://example.com")
            .assert()
            .failure()
            .code(1)
            .stderr(contains("requests per second"));
    }

    #[test]
    fn test_missing_urls() {
        cargo_bin_cmd!()
            .assert()
            .failure()
            .stderr(contains("required"));
    }

    #[test]
    fn test_help() {
        cargo_bin_cmd!()
            .arg("--help")
            .assert()
            .success()
            .stdout(contains("--retry-wait-time"))
            .stdout(contains("wizz.toml"));
    }
}
