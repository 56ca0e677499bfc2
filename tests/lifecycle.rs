//! End-to-end lifecycle tests over real sockets.
//!
//! Every test binds 127.0.0.1:0 so runs never collide on a port. Requests
//! are written raw over a `TcpStream` — the assertions are about wire
//! behaviour, an HTTP client would only get in the way.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use pulse::{Config, HealthService};

fn local_config(lameduck: Duration, lookup: Vec<String>) -> Config {
    Config::new("127.0.0.1:0", lameduck, lookup).unwrap()
}

/// Issues `GET <path>` with `connection: close` and returns the full raw
/// response once the server closes the connection.
async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let req = format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

fn body_of(raw: &str) -> &str {
    raw.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

/// Issues `GET /health` *without* `connection: close`, reads one full 200
/// response, and returns the still-open stream — the way a polling
/// orchestrator parks a keep-alive connection between checks.
async fn keepalive_get(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "server closed a keep-alive connection early");
        raw.extend_from_slice(&buf[..n]);
        if raw.windows(4).any(|w| w == b"\r\n\r\n") && raw.ends_with(b"OK") {
            break;
        }
    }
    let res = String::from_utf8(raw).unwrap();
    assert!(res.starts_with("HTTP/1.1 200"), "got: {res}");
    stream
}

#[tokio::test]
async fn healthy_endpoint_returns_200_ok() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    let res = http_get(addr, "/health").await;
    assert!(res.starts_with("HTTP/1.1 200"), "got: {res}");
    assert_eq!(body_of(&res), "OK");

    service.on_final_shutdown().await.unwrap();
}

#[tokio::test]
async fn unresolvable_target_returns_500() {
    // .invalid is reserved (RFC 2606); the lookup always fails.
    let lookup = vec!["nonexistent.invalid.example".to_string()];
    let mut service = HealthService::new(local_config(Duration::ZERO, lookup));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    let res = http_get(addr, "/health").await;
    assert!(res.starts_with("HTTP/1.1 500"), "got: {res}");
    assert_eq!(body_of(&res), "Internal Server Error");

    service.on_final_shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_path_returns_404() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    let res = http_get(addr, "/metrics").await;
    assert!(res.starts_with("HTTP/1.1 404"), "got: {res}");

    service.on_final_shutdown().await.unwrap();
}

#[tokio::test]
async fn zero_lameduck_shutdown_is_immediate() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    assert!(service.running());

    let began = Instant::now();
    service.on_final_shutdown().await.unwrap();
    assert!(!service.running());
    assert!(service.local_addr().is_none());
    assert!(began.elapsed() < Duration::from_secs(1), "shutdown blocked");
}

#[tokio::test]
async fn lameduck_window_keeps_answering_and_delays_teardown() {
    let lameduck = Duration::from_millis(400);
    let mut service = HealthService::new(local_config(lameduck, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    let began = Instant::now();
    let shutdown = tokio::spawn(async move {
        service.on_final_shutdown().await.unwrap();
        service
    });

    // Mid-window the endpoint must still answer, and answer healthy.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let res = http_get(addr, "/health").await;
    assert!(res.starts_with("HTTP/1.1 200"), "got: {res}");
    assert_eq!(body_of(&res), "OK");

    let service = shutdown.await.unwrap();
    assert!(began.elapsed() >= lameduck, "drain window was cut short");
    assert!(!service.running());
}

#[tokio::test]
async fn reload_never_sleeps() {
    // A lameduck long enough that sleeping on reload would fail the test.
    let mut service = HealthService::new(local_config(Duration::from_secs(30), Vec::new()));
    service.on_start().unwrap();

    let began = Instant::now();
    service.on_reload().await.unwrap();
    assert!(!service.running());
    assert!(began.elapsed() < Duration::from_secs(1), "reload slept");
}

#[tokio::test]
async fn stop_calls_on_a_stopped_service_are_noops() {
    let mut service = HealthService::new(local_config(Duration::from_secs(30), Vec::new()));
    assert!(!service.running());

    service.on_reload().await.unwrap();
    service.on_final_shutdown().await.unwrap();
    assert!(!service.running());

    // Same after a full start/stop cycle.
    service.on_start().unwrap();
    service.on_reload().await.unwrap();
    service.on_reload().await.unwrap();
    service.on_final_shutdown().await.unwrap();
    assert!(!service.running());
}

#[tokio::test]
async fn reload_is_not_blocked_by_an_idle_keepalive_connection() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    // Fully answered request, socket deliberately held open.
    let stream = keepalive_get(addr).await;

    // Teardown must close the idle connection itself, not wait out the
    // client; a hang here means it is draining idle sockets, not requests.
    tokio::time::timeout(Duration::from_secs(3), service.on_reload())
        .await
        .expect("on_reload hung behind an idle keep-alive connection")
        .unwrap();
    assert!(!service.running());
    drop(stream);
}

#[tokio::test]
async fn final_shutdown_closes_idle_keepalive_connections() {
    let lameduck = Duration::from_millis(200);
    let mut service = HealthService::new(local_config(lameduck, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    let mut stream = keepalive_get(addr).await;

    let began = Instant::now();
    tokio::time::timeout(Duration::from_secs(3), service.on_final_shutdown())
        .await
        .expect("on_final_shutdown hung behind an idle keep-alive connection")
        .unwrap();
    assert!(began.elapsed() >= lameduck, "drain window was cut short");
    assert!(!service.running());

    // The server ends the connection during teardown: the client sees EOF.
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "expected the server to close the idle connection");
}

#[tokio::test]
async fn restart_after_reload_rebinds_the_same_port() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    let first = service.local_addr().unwrap();

    // Reload, then start a replacement on the exact port just vacated —
    // the reuse options make this race-free.
    service.on_reload().await.unwrap();
    let mut replacement = HealthService::new(
        Config::new(&first.to_string(), Duration::ZERO, Vec::new()).unwrap(),
    );
    replacement.on_start().unwrap();
    assert_eq!(replacement.local_addr(), Some(first));

    let res = http_get(first, "/health").await;
    assert!(res.starts_with("HTTP/1.1 200"), "got: {res}");

    replacement.on_final_shutdown().await.unwrap();
}

#[tokio::test]
async fn start_is_idempotent_while_running() {
    let mut service = HealthService::new(local_config(Duration::ZERO, Vec::new()));
    service.on_start().unwrap();
    let addr = service.local_addr().unwrap();

    service.on_start().unwrap();
    assert_eq!(service.local_addr(), Some(addr));

    service.on_final_shutdown().await.unwrap();
}
