//! Readiness polling against local sockets
//!
//! A refused port stands in for a server that has not started yet; a
//! minimal TCP responder stands in for one that has.

use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use conda_store_ux::readiness::{Backoff, Readiness, ReadinessConfig, ReadinessPoller};

fn config(max_wait_ms: u64, interval_ms: u64) -> ReadinessConfig {
    ReadinessConfig {
        enabled: true,
        max_wait_ms,
        request_timeout_ms: 500,
        backoff: Backoff::Fixed { interval_ms },
        no_proxy: true,
    }
}

/// A port nothing is listening on
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Answer every connection on `listener` with `status_line`
async fn serve(listener: TcpListener, status_line: &'static str) {
    while let Ok((mut stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status_line
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

#[tokio::test]
async fn any_status_counts_as_ready() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, "503 Service Unavailable"));

    let poller = ReadinessPoller::new(&config(5_000, 50)).unwrap();
    match poller.wait_for(&url).await.unwrap() {
        Readiness::Ready { attempts, status, .. } => {
            assert_eq!(attempts, 1);
            assert_eq!(status, 503);
        }
        other => panic!("expected ready, got {:?}", other),
    }
}

#[tokio::test]
async fn gives_up_after_max_wait() {
    let url = format!("http://127.0.0.1:{}/", closed_port());
    let poller = ReadinessPoller::new(&config(500, 100)).unwrap();

    let start = Instant::now();
    let readiness = poller.wait_for(&url).await.unwrap();
    let elapsed = start.elapsed();

    match readiness {
        Readiness::TimedOut { attempts, elapsed_ms } => {
            assert!(attempts >= 2, "expected retries, got {} attempt(s)", attempts);
            assert!(elapsed_ms >= 500);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(
        elapsed < Duration::from_secs(5),
        "polling overran its deadline: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn dropped_connections_are_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            drop(stream);
        }
    });

    let poller = ReadinessPoller::new(&config(1_000, 100)).unwrap();
    match poller.wait_for(&url).await.unwrap() {
        Readiness::TimedOut { attempts, .. } => {
            assert!(attempts >= 2, "expected retries, got {} attempt(s)", attempts)
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn zero_wait_makes_a_single_attempt() {
    let url = format!("http://127.0.0.1:{}/", closed_port());
    let poller = ReadinessPoller::new(&config(0, 100)).unwrap();

    match poller.wait_for(&url).await.unwrap() {
        Readiness::TimedOut { attempts, .. } => assert_eq!(attempts, 1),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn ready_once_server_comes_up() {
    let port = closed_port();
    let url = format!("http://127.0.0.1:{}/", port);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        serve(listener, "200 OK").await;
    });

    let poller = ReadinessPoller::new(&config(10_000, 50)).unwrap();
    match poller.wait_for(&url).await.unwrap() {
        Readiness::Ready { attempts, status, .. } => {
            assert!(attempts > 1);
            assert_eq!(status, 200);
        }
        other => panic!("expected ready, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_url_is_an_error() {
    let poller = ReadinessPoller::new(&config(1_000, 50)).unwrap();
    assert!(poller.wait_for("not a url").await.is_err());
}
