//! Common test utilities for LiveSockets integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How the mock server treats each accepted connection
#[derive(Debug, Clone)]
pub enum ServerMode {
    /// Echo text and binary frames back
    Echo,
    /// Complete the handshake, then close right away
    CloseAfterHandshake,
    /// Send these text frames after the handshake, then echo
    Script(Vec<String>),
}

/// A small mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    accepts: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Start an echo server
    pub async fn start() -> Self {
        Self::start_with(ServerMode::Echo).await
    }

    pub async fn start_with(mode: ServerMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(Notify::new());

        let accepts_clone = accepts.clone();
        let received_clone = received.clone();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                accepts_clone.fetch_add(1, Ordering::SeqCst);
                                let mode = mode.clone();
                                let received = received_clone.clone();
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, mode, received, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            accepts,
            received,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        mode: ServerMode,
        received: Arc<Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        match mode {
            ServerMode::CloseAfterHandshake => {
                let _ = write.close().await;
                return;
            }
            ServerMode::Script(frames) => {
                for frame in frames {
                    if write.send(Message::Text(frame)).await.is_err() {
                        return;
                    }
                }
            }
            ServerMode::Echo => {}
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if let Message::Text(text) = &msg {
                                received.lock().push(text.clone());
                            }
                            if msg.is_text() || msg.is_binary() {
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Connections accepted so far
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Text frames received from clients, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A local URL nothing is listening on
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Poll `check` every 10ms until it holds or `timeout` passes
pub async fn wait_until(timeout: std::time::Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}

/// Test handlers
pub mod fixtures {
    use async_trait::async_trait;
    use livesockets::*;
    use parking_lot::Mutex;
    use std::sync::{Arc, OnceLock, Weak};

    /// Passes text frames through untouched
    pub struct TextRouter;

    #[async_trait]
    impl MessageRouter for TextRouter {
        type Message = String;

        async fn parse(&self, message: WsMessage) -> Result<String> {
            message
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| SocketError::ParseError("binary frame".into()))
        }
    }

    /// Records every message and connection change
    #[derive(Default)]
    pub struct RecordingHandler {
        pub messages: Mutex<Vec<String>>,
        pub changes: Mutex<Vec<bool>>,
    }

    impl MessageHandler<String> for RecordingHandler {
        fn handle(&self, message: String) -> Result<()> {
            self.messages.lock().push(message);
            Ok(())
        }

        fn on_connection_change(&self, connected: bool) {
            self.changes.lock().push(connected);
        }
    }

    pub struct StaticAuth(pub &'static str);

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn auth_message(&self) -> Result<Option<WsMessage>> {
            Ok(Some(WsMessage::from(self.0)))
        }
    }

    /// Records the client's state at every connection change
    #[derive(Default)]
    pub struct StateRecorder {
        pub client: OnceLock<Weak<WebSocketClient<TextRouter>>>,
        pub seen: Mutex<Vec<(bool, ConnectionState)>>,
    }

    impl MessageHandler<String> for StateRecorder {
        fn handle(&self, _message: String) -> Result<()> {
            Ok(())
        }

        fn on_connection_change(&self, connected: bool) {
            if let Some(client) = self.client.get().and_then(Weak::upgrade) {
                self.seen.lock().push((connected, client.connection_state()));
            }
        }
    }

    pub fn recording() -> Arc<RecordingHandler> {
        Arc::new(RecordingHandler::default())
    }
}
