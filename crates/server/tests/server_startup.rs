use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config
fn minimal_config(port: u16, output_dir: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
output_dir = "{}"

[acquirer]
binary_path = "/nonexistent/N_m3u8DL-RE"
"#,
        port,
        output_dir.display()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_ripline"))
        .env("RIPLINE_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let output_dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, &output_dir.path().join("stream")));

    let mut server = spawn_server(config.path()).await;

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = assert_ok!(
        client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
    );

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");
    // A missing tool is reported, not fatal
    assert_eq!(json["tools"]["acquirer"]["status"], "unavailable");

    // The output directory is created at startup
    assert!(output_dir.path().join("stream").is_dir());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let output_dir = TempDir::new().unwrap();
    let content = format!(
        r#"{}
[publisher]
upload_url = "https://uploads.example.com/api"
token = "super-secret-token"
"#,
        minimal_config(port, output_dir.path())
    );
    let config = write_config(&content);

    let mut server = spawn_server(config.path()).await;

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = assert_ok!(
        client
            .get(format!("http://127.0.0.1:{}/api/v1/config", port))
            .send()
            .await
    );

    assert!(response.status().is_success());

    let text = response.text().await.expect("Failed to read body");
    assert!(!text.contains("super-secret-token"));

    let json: serde_json::Value = serde_json::from_str(&text).expect("Failed to parse JSON");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["publisher"]["token_configured"], true);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_ripline"))
            .env("RIPLINE_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out");
    let result = assert_ok!(result);

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_publisher_exits_with_error() {
    let content = r#"
[server]
port = 8080

[publisher]
upload_url = "ftp://uploads.example.com"
token = "token"
"#;
    let config = write_config(content);

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_ripline"))
            .env("RIPLINE_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out");
    let result = assert_ok!(result);

    assert!(!result.status.success());
}
