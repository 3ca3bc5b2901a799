mod common;

use axum::Json;
use axum::routing::post;
use std::io::Write;
use std::net::SocketAddr;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn gateway_bin() -> String {
    std::env::var("CARGO_BIN_EXE_incommon-gateway").unwrap_or_else(|_| {
        let current = std::env::current_exe().expect("current exe");
        let debug_dir = current
            .parent()
            .and_then(|p| p.parent())
            .expect("target debug dir");
        debug_dir
            .join("incommon-gateway")
            .to_string_lossy()
            .to_string()
    })
}

fn spawn_gateway(token_url: &str, credentials_path: &std::path::Path) -> std::process::Child {
    let mut cmd = Command::new(gateway_bin());
    cmd.env("INCOMMON_BIND", "127.0.0.1:0")
        .env("INCOMMON_METRICS_BIND", "127.0.0.1:0")
        .env("INCOMMON_TOKEN_URL", token_url)
        .env("INCOMMON_API_BASE_URL", "http://127.0.0.1:9/byuapi")
        .env("INCOMMON_CREDENTIALS_PATH", credentials_path)
        .env("INCOMMON_UPSTREAM_TIMEOUT_MS", "2000")
        .env_remove("INCOMMON_CONFIG")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd.spawn().expect("spawn gateway")
}

fn stop_with_sigint(child: &mut std::process::Child) {
    let pid = child.id().to_string();
    let status = Command::new("kill")
        .arg("-INT")
        .arg(pid)
        .status()
        .expect("send SIGINT");
    assert!(status.success());
}

fn wait_for_exit(child: &mut std::process::Child, timeout: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() >= deadline {
            child.kill().expect("kill on timeout");
            return child.wait().expect("wait after kill");
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

fn credentials_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(file, r#"{{"API_USER": "client-1", "API_PASS": "s3cret"}}"#).expect("write");
    file
}

async fn spawn_token_server() -> SocketAddr {
    common::spawn_server(axum::Router::new().route(
        "/token",
        post(|| async { Json(serde_json::json!({"access_token": "runtime-token"})) }),
    ))
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn binary_starts_and_stops_on_sigint() {
    let addr = spawn_token_server().await;
    let creds = credentials_file();
    let mut child = spawn_gateway(&format!("http://{addr}/token"), creds.path());
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(
        child.try_wait().expect("try_wait").is_none(),
        "gateway exited during startup"
    );
    stop_with_sigint(&mut child);
    let status = tokio::task::spawn_blocking(move || wait_for_exit(&mut child, Duration::from_secs(3)))
        .await
        .expect("join");
    assert!(status.success());
}

#[test]
fn binary_fails_without_credentials() {
    let mut child = spawn_gateway(
        "http://127.0.0.1:9/token",
        std::path::Path::new("/nonexistent/in-common.json"),
    );
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(!status.success());
}

#[test]
fn binary_fails_when_token_endpoint_is_unreachable() {
    let creds = credentials_file();
    let mut child = spawn_gateway("http://127.0.0.1:9/token", creds.path());
    let status = wait_for_exit(&mut child, Duration::from_secs(5));
    assert!(!status.success());
}
