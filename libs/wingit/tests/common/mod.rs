//! Common test utilities for Wingit integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// A frame the server read, with the time it arrived
#[derive(Debug, Clone)]
pub struct Received {
    pub frame: Value,
    pub at: Instant,
}

impl Received {
    pub fn kind(&self) -> &str {
        self.frame["type"].as_str().unwrap_or_default()
    }
}

/// Mock chat server
///
/// Answers `authenticate` with an auth success and `status_request` with a
/// `status_response` of `online`. Frames passed to [`push`](Self::push) are
/// written to every open connection.
pub struct MockChatServer {
    pub addr: SocketAddr,
    accepts: Arc<AtomicUsize>,
    opened_at: Arc<Mutex<Vec<Instant>>>,
    received: Arc<Mutex<Vec<Received>>>,
    online: Arc<Mutex<Vec<i64>>>,
    pushes: broadcast::Sender<String>,
    shutdown: Arc<Notify>,
}

impl MockChatServer {
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0").await
    }

    /// Listen on a fixed address, e.g. one a client is already retrying
    pub async fn start_on(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (pushes, _) = broadcast::channel(64);

        let server = Self {
            addr,
            accepts: Arc::new(AtomicUsize::new(0)),
            opened_at: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            online: Arc::new(Mutex::new(Vec::new())),
            pushes,
            shutdown: Arc::new(Notify::new()),
        };

        let accepts = server.accepts.clone();
        let opened_at = server.opened_at.clone();
        let received = server.received.clone();
        let online = server.online.clone();
        let pushes = server.pushes.clone();
        let shutdown = server.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        accepts.fetch_add(1, Ordering::SeqCst);
                        let opened_at = opened_at.clone();
                        let received = received.clone();
                        let online = online.clone();
                        let pushes = pushes.subscribe();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            Self::handle_connection(stream, opened_at, received, online, pushes, shutdown).await;
                        });
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        server
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        opened_at: Arc<Mutex<Vec<Instant>>>,
        received: Arc<Mutex<Vec<Received>>>,
        online: Arc<Mutex<Vec<i64>>>,
        mut pushes: broadcast::Receiver<String>,
        shutdown: Arc<Notify>,
    ) {
        let Ok(ws_stream) = accept_async(stream).await else {
            return;
        };
        opened_at.lock().push(Instant::now());
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => continue,
                    };
                    let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
                    let reply = match frame["type"].as_str() {
                        Some("authenticate") => Some(json!({"type": "auth", "status": "success"})),
                        Some("status_request") => {
                            let users: Vec<Value> = online
                                .lock()
                                .iter()
                                .map(|id| json!({"userId": id, "username": format!("user{}", id)}))
                                .collect();
                            Some(json!({"type": "status_response", "data": users}))
                        }
                        _ => None,
                    };
                    received.lock().push(Received { frame, at: Instant::now() });
                    if let Some(reply) = reply {
                        if write.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
                push = pushes.recv() => {
                    let Ok(push) = push else { break };
                    if write.send(Message::Text(push)).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// When each connection finished its handshake
    pub fn opened_at(&self) -> Vec<Instant> {
        self.opened_at.lock().clone()
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    pub fn received_of(&self, kind: &str) -> Vec<Received> {
        self.received().into_iter().filter(|r| r.kind() == kind).collect()
    }

    /// Users listed in every future `status_response`
    pub fn set_online(&self, users: &[i64]) {
        *self.online.lock() = users.to_vec();
    }

    /// Write a frame to every open connection
    pub fn push(&self, frame: Value) {
        let _ = self.pushes.send(frame.to_string());
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A local address nothing is listening on yet
pub async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `check` every 10ms until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Config pointed at `url` with short timers
pub fn test_config(url: &str) -> wingit::RealtimeConfig {
    let mut config = wingit::RealtimeConfig::default();
    config.ws_url = url.to_string();
    config.reconnect_interval_ms = 50;
    config.presence_request_delay_ms = 200;
    config
}
