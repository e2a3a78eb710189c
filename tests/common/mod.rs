//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vhost_proxy::config::{ProxyConfig, RouteConfig};
use vhost_proxy::lifecycle::{self, Shutdown};
use vhost_proxy::net::ListenerError;
use vhost_proxy::protocol::frame::read_length_prefix;

pub const WAIT: Duration = Duration::from_secs(5);

/// A proxy running on a loopback port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

pub fn route(name: &str, backend: SocketAddr, pattern: &str) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        backend: backend.to_string(),
        pattern: pattern.into(),
    }
}

/// Start a proxy with the given routes and short time budgets.
pub async fn start_proxy(routes: Vec<RouteConfig>) -> TestProxy {
    start_proxy_with(routes, |_| {}).await
}

/// Like [`start_proxy`], with a chance to adjust the configuration first.
pub async fn start_proxy_with(routes: Vec<RouteConfig>, adjust: impl FnOnce(&mut ProxyConfig)) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.connect_secs = 2;
    config.timeouts.handshake_secs = 1;
    config.timeouts.idle_secs = 5;
    config.timeouts.shutdown_secs = 1;
    config.routes = routes;
    adjust(&mut config);

    let (server, listener) = lifecycle::start(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestProxy { addr, shutdown, handle }
}

/// Handshake frame with version 763 (0xFB 0x05).
pub fn handshake(host: &str, port: [u8; 2], state: u8) -> Vec<u8> {
    let payload_len = host.len() + 3;
    let mut bytes = vec![(payload_len + 4) as u8, 0x00, 0xFB, 0x05, host.len() as u8];
    bytes.extend_from_slice(host.as_bytes());
    bytes.extend_from_slice(&port);
    bytes.push(state);
    bytes
}

/// Backend that answers one status request per connection with `response`.
///
/// Each request it receives (handshake + status marker) is sent on the channel.
pub async fn start_status_backend(response: Vec<u8>, request_len: usize) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = vec![0u8; request_len];
                if socket.read_exact(&mut request).await.is_err() {
                    return;
                }
                let _ = tx.send(request);
                let _ = socket.write_all(&response).await;
            });
        }
    });

    (addr, rx)
}

/// Backend that records the login handshake it receives, then echoes.
///
/// Sends the handshake frame on the channel, and an empty vector once the
/// proxy closes the connection.
pub async fn start_login_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(Some(prefix)) = read_length_prefix(&mut socket).await else {
                    return;
                };
                let mut body = vec![0u8; prefix.value];
                if socket.read_exact(&mut body).await.is_err() {
                    return;
                }
                let mut frame = prefix.raw;
                frame.extend_from_slice(&body);
                let _ = tx.send(frame);

                let (mut rd, mut wr) = socket.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
                let _ = tx.send(Vec::new());
            });
        }
    });

    (addr, rx)
}

/// Backend that reads the login handshake, writes `farewell` and hangs up.
pub async fn start_closing_backend(farewell: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(Some(prefix)) = read_length_prefix(&mut socket).await else {
                    return;
                };
                let mut body = vec![0u8; prefix.value];
                if socket.read_exact(&mut body).await.is_ok() {
                    let _ = socket.write_all(farewell).await;
                }
            });
        }
    });

    addr
}

/// Backend that reads the login handshake, then writes one byte every
/// `interval`, `count` times, and hangs up. It never reads again.
pub async fn start_streaming_backend(count: usize, interval: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(Some(prefix)) = read_length_prefix(&mut socket).await else {
                    return;
                };
                let mut body = vec![0u8; prefix.value];
                if socket.read_exact(&mut body).await.is_err() {
                    return;
                }
                for _ in 0..count {
                    tokio::time::sleep(interval).await;
                    if socket.write_all(b"t").await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    probe.local_addr().unwrap()
}

/// Assert the proxy closes `stream` without sending a single byte.
pub async fn assert_closed_without_reply(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(WAIT, stream.read(&mut buf))
        .await
        .expect("proxy should close the connection");
    match read {
        Ok(0) => {}
        Ok(n) => panic!("expected no reply, got {:?}", &buf[..n]),
        // Closing with unread input resets instead of a clean FIN.
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {}
        Err(e) => panic!("unexpected error: {}", e),
    }
}
