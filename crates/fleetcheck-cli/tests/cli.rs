//! Runs the `fleetcheck` binary against in-process discovery and health servers.

use std::io::Write;
use std::process::{Command, Output};

use fleetcheck_http::test_server::{TestServer, respond, respond_json, unused_addr};
use serde_json::json;

/// Answers `/<code>/health` with `<code>`.
async fn health_server() -> TestServer {
    TestServer::spawn(|req| {
        let status = req
            .uri()
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(200);
        respond(status, "")
    })
    .await
    .unwrap()
}

/// Serves `/state` with one `foo` announcement per entry of `statuses`.
async fn discovery_server(health: &TestServer, statuses: &[u16]) -> TestServer {
    let announcements: Vec<_> = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            json!({
                "announcementId": format!("ann-{i}"),
                "serviceType": "foo",
                "serviceUri": health.url(&format!("/{status}/")),
                "environment": "test",
            })
        })
        .collect();
    let body = serde_json::to_string(&announcements).unwrap();
    TestServer::spawn(move |req| {
        if req.uri().path() == "/state" {
            respond_json(200, &body)
        } else {
            respond(404, "")
        }
    })
    .await
    .unwrap()
}

async fn fleetcheck(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
            .args(&args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test]
async fn healthy_fleet_exits_ok() {
    let health = health_server().await;
    let discovery = discovery_server(&health, &[200, 200]).await;

    let output = fleetcheck(args(&["-d", &discovery.url(""), "-s", "foo", "-w", "2"])).await;

    let out = stdout(&output);
    assert_eq!(output.status.code(), Some(0), "stdout: {out}");
    assert!(out.starts_with("OK: 2 instances of foo found | instances=2\n"), "{out}");
    assert_eq!(out.matches("status code: 200").count(), 2);
}

#[tokio::test]
async fn failing_instance_exits_critical() {
    let health = health_server().await;
    let discovery = discovery_server(&health, &[200, 503]).await;

    let output = fleetcheck(args(&["-d", &discovery.url(""), "-s", "foo", "-w", "2"])).await;

    let out = stdout(&output);
    assert_eq!(output.status.code(), Some(2), "stdout: {out}");
    assert!(out.starts_with("CRITICAL: "), "{out}");
    assert!(out.contains("status code: 503"));
}

#[tokio::test]
async fn quota_shortfall_exits_warning() {
    let health = health_server().await;
    let discovery = discovery_server(&health, &[200]).await;

    let output = fleetcheck(args(&[
        "-d", &discovery.url(""), "-s", "foo", "-n", "-c", "1", "-w", "3",
    ]))
    .await;

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "WARNING: 1 instances of foo found, expected at least 3 | instances=1\n"
    );
}

#[tokio::test]
async fn unreachable_discovery_exits_unknown() {
    let addr = unused_addr().await;

    let output = fleetcheck(args(&["-d", &format!("http://{addr}"), "-s", "foo"])).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).starts_with("UNKNOWN: failed to fetch discovery state"));
}

#[tokio::test]
async fn config_file_supplies_settings() {
    let health = health_server().await;
    let discovery = discovery_server(&health, &[200]).await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "discovery = \"{}\"\nservice = \"foo\"\nno-healthcheck = true",
        discovery.url("")
    )
    .unwrap();

    let output = fleetcheck(args(&["--config", file.path().to_str().unwrap()])).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "OK: 1 instances of foo found | instances=1\n");
}

#[test]
fn missing_discovery_exits_unknown() {
    let output = Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
        .args(["-s", "foo"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(
        stdout(&output),
        "UNKNOWN: invalid configuration: discovery server URL is required\n"
    );
}

#[test]
fn inverted_thresholds_exit_unknown() {
    let output = Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
        .args(["-d", "http://discovery.test", "-s", "foo", "-c", "3", "-w", "2"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).starts_with("UNKNOWN: invalid configuration: warn threshold"));
}

#[test]
fn unknown_flag_exits_unknown() {
    let output = Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
        .arg("--bogus")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).starts_with("UNKNOWN: invalid configuration: invalid arguments:"));
}

#[test]
fn help_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
        .arg("--help")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--discovery"));
}
