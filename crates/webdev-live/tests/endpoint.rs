//! HTTP behavior of the live reload routes, over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use webdev_live::{live_router, LiveHub, LiveRoutes};

async fn serve(hub: LiveHub) -> SocketAddr {
    let app = live_router(hub, &LiveRoutes::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn send(addr: SocketAddr, path: &str, accept: Option<&str>) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n");
    if let Some(accept) = accept {
        request.push_str(&format!("Accept: {accept}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    stream
}

/// Read until `needle` shows up; returns everything read so far.
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    timeout(Duration::from_secs(5), async {
        loop {
            let read = stream.read(&mut buf).await.unwrap();
            assert!(read > 0, "connection closed before {needle:?} arrived");
            seen.extend_from_slice(&buf[..read]);
            if String::from_utf8_lossy(&seen).contains(needle) {
                break;
            }
        }
    })
    .await
    .unwrap();
    String::from_utf8_lossy(&seen).into_owned()
}

async fn open_session(addr: SocketAddr) -> TcpStream {
    let mut stream = send(addr, "/web-bundler/live", Some("text/event-stream")).await;
    read_until(&mut stream, "data: Connected").await;
    stream
}

async fn wait_for_count(hub: &LiveHub, count: usize) {
    timeout(Duration::from_secs(5), async {
        while hub.connection_count() != count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn event_stream_session_starts_with_connect() {
    let addr = serve(LiveHub::default()).await;
    let mut stream = send(addr, "/web-bundler/live", Some("text/html, text/event-stream")).await;

    let response = read_until(&mut stream, "data: Connected").await;
    let lower = response.to_lowercase();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(lower.contains("content-type: text/event-stream"));
    assert!(lower.contains("cache-control: no-cache"));
    assert!(lower.contains("transfer-encoding: chunked"));
    assert!(response.contains("id: 0\nevent: connect\ndata: Connected\n\n"));
}

#[tokio::test]
async fn request_without_accept_gets_empty_ok() {
    let hub = LiveHub::default();
    let addr = serve(hub.clone()).await;
    let mut stream = send(addr, "/web-bundler/live", None).await;

    let response = read_until(&mut stream, "\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.to_lowercase().contains("content-length: 0"));
    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn third_session_is_rejected_until_one_closes() {
    let hub = LiveHub::new(2, Duration::from_millis(50));
    let addr = serve(hub.clone()).await;

    let first = open_session(addr).await;
    let _second = open_session(addr).await;
    assert_eq!(hub.connection_count(), 2);

    let mut third = send(addr, "/web-bundler/live", Some("text/event-stream")).await;
    let response = read_until(&mut third, "\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 429"));

    drop(first);
    wait_for_count(&hub, 1).await;

    let _fourth = open_session(addr).await;
    assert_eq!(hub.connection_count(), 2);
}

#[tokio::test]
async fn disconnected_clients_free_their_slots_before_the_heartbeat() {
    let hub = LiveHub::default();
    let addr = serve(hub.clone()).await;

    let first = open_session(addr).await;
    let second = open_session(addr).await;
    assert!(hub.is_full());

    drop(first);
    drop(second);
    wait_for_count(&hub, 0).await;

    let _third = open_session(addr).await;
    let _fourth = open_session(addr).await;
    assert_eq!(hub.connection_count(), 2);
}

#[tokio::test]
async fn client_script_is_served_with_live_path() {
    let addr = serve(LiveHub::default()).await;
    let mut stream = send(addr, "/web-bundler/live-reload.js", None).await;

    let response = read_until(&mut stream, "EventSource").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.to_lowercase().contains("content-type: application/javascript"));
    assert!(response.contains("\"/web-bundler/live\""));
}
