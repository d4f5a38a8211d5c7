use crate::core::config::ClientConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::traits::*;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Unread lifecycle events kept per client; the oldest is dropped first
pub const EVENT_QUEUE_CAPACITY: usize = 64;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Internal command messages for the connection task
#[derive(Debug)]
enum ClientCommand {
    /// Write a message to the socket
    Send(WsMessage),
    /// Close the socket, do not reconnect
    Shutdown,
}

/// Connection lifecycle events emitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Socket opened
    Connected,
    /// Socket closed without an explicit disconnect
    Disconnected,
    /// Retry scheduled (1-based attempt number)
    Reconnecting(usize),
    /// Reconnect budget spent after this many attempts
    GaveUp(usize),
    /// Dial or transport error
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub reconnect_attempts: u64,
    pub connection_state: ConnectionState,
}

/// Handle on the currently running connection task
struct ActiveTask {
    shutdown: Arc<AtomicBool>,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    handle: tokio::task::JoinHandle<()>,
}

impl ActiveTask {
    fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }
}

/// Single-connection WebSocket client
///
/// - One connection task at a time, spawned by [`connect`](Self::connect)
/// - Post-connect auth message from the configured [`AuthProvider`]
/// - Inbound frames parsed by the router and handed to the handler in order
/// - Bounded reconnection after unexpected closes, none after [`disconnect`](Self::disconnect)
pub struct WebSocketClient<R>
where
    R: MessageRouter,
{
    config: Arc<ClientConfig<R>>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    active: Mutex<Option<ActiveTask>>,
    event_tx: Sender<ClientEvent>,
    event_rx: Receiver<ClientEvent>,
}

impl<R> WebSocketClient<R>
where
    R: MessageRouter,
{
    /// Create a new client from configuration
    ///
    /// Nothing is dialed until [`connect`](Self::connect) is called.
    pub(crate) fn new(config: ClientConfig<R>) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            config: Arc::new(config),
            state: Arc::new(AtomicConnectionState::new(ConnectionState::Idle)),
            metrics: Arc::new(AtomicMetrics::new()),
            active: Mutex::new(None),
            event_tx,
            event_rx,
        }
    }

    /// Open the connection
    ///
    /// Resolves once the socket is open. The auth message is written right
    /// after, ahead of anything passed to [`send`](Self::send); its answer is
    /// not awaited.
    ///
    /// # Errors
    /// * `ConnectionInProgress` - a dial or retry is already underway
    /// * `Connect` - the first dial failed; retries continue in the background
    pub async fn connect(&self) -> Result<()> {
        match self
            .state
            .transition_if(ConnectionState::accepts_connect, ConnectionState::Connecting)
        {
            Ok(_) => {}
            Err(ConnectionState::Open) => {
                debug!("connect() while open, nothing to do");
                return Ok(());
            }
            Err(state) => {
                debug!(%state, "connect() refused");
                return Err(SocketError::ConnectionInProgress);
            }
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = oneshot::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let task = ConnectionTask {
                config: Arc::clone(&self.config),
                state: Arc::clone(&self.state),
                metrics: Arc::clone(&self.metrics),
                shutdown: Arc::clone(&shutdown),
                event_tx: self.event_tx.clone(),
                event_rx: self.event_rx.clone(),
            };
            tokio::spawn(task.run(command_rx, opened_tx))
        };

        let previous = self.active.lock().replace(ActiveTask {
            shutdown,
            command_tx,
            handle,
        });
        if let Some(previous) = previous {
            previous.stop();
            previous.handle.abort();
        }

        match opened_rx.await {
            Ok(result) => result,
            Err(_) => Err(SocketError::ConnectionClosed(
                "connection task ended before opening".into(),
            )),
        }
    }

    /// Close the connection and stop reconnecting
    ///
    /// Idempotent; safe to call in any state.
    pub fn disconnect(&self) {
        let active = self.active.lock().take();
        match active {
            Some(task) => {
                info!(url = %self.config.url, "Disconnecting");
                self.state.set(ConnectionState::Closing);
                task.stop();
                self.state.set(ConnectionState::Closed);
            }
            None => {
                if !matches!(self.state.get(), ConnectionState::Idle) {
                    self.state.set(ConnectionState::Closed);
                }
            }
        }
    }

    /// Write a message to the socket
    ///
    /// # Errors
    /// `NotConnected` unless the socket is open. The message is dropped,
    /// never queued for a later connection.
    pub fn send(&self, message: WsMessage) -> Result<()> {
        if !self.state.is_connected() {
            self.metrics.increment_dropped();
            return Err(SocketError::NotConnected);
        }

        let guard = self.active.lock();
        let sent = guard
            .as_ref()
            .map(|task| task.command_tx.send(ClientCommand::Send(message)).is_ok())
            .unwrap_or(false);

        if sent {
            Ok(())
        } else {
            self.metrics.increment_dropped();
            Err(SocketError::NotConnected)
        }
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if the socket is open
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Target URL
    pub fn url(&self) -> &str {
        self.config.url()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            messages_dropped: self.metrics.messages_dropped(),
            reconnect_attempts: self.metrics.reconnect_attempts(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// A second receiver on the event stream
    ///
    /// Events are delivered to exactly one receiver each.
    pub fn events(&self) -> Receiver<ClientEvent> {
        self.event_rx.clone()
    }
}

impl<R> Drop for WebSocketClient<R>
where
    R: MessageRouter,
{
    fn drop(&mut self) {
        if let Some(task) = self.active.get_mut().take() {
            task.stop();
        }
    }
}

/// Everything the connection task shares with the client handle
struct ConnectionTask<R>
where
    R: MessageRouter,
{
    config: Arc<ClientConfig<R>>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    shutdown: Arc<AtomicBool>,
    event_tx: Sender<ClientEvent>,
    /// Used only to evict the oldest event when nobody is reading
    event_rx: Receiver<ClientEvent>,
}

impl<R> ConnectionTask<R>
where
    R: MessageRouter,
{
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// State writes from the task never override an explicit close
    fn set_unless_closed(&self, to: ConnectionState) -> bool {
        self.state
            .transition_if(
                |s| !matches!(s, ConnectionState::Closing | ConnectionState::Closed),
                to,
            )
            .is_ok()
    }

    fn emit(&self, event: ClientEvent) {
        let mut event = event;
        loop {
            match self.event_tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.event_rx.try_recv();
                    event = rejected;
                }
            }
        }
    }

    /// Main connection loop: dial, serve, and retry under the strategy
    async fn run(
        self,
        mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        opened_tx: oneshot::Sender<Result<()>>,
    ) {
        let mut tracker = self.config.new_tracker();
        let mut opened_tx = Some(opened_tx);

        loop {
            if self.is_shutdown() {
                break;
            }

            let dialed = tokio::select! {
                result = connect_async(self.config.url.as_str()) => Some(result),
                _ = wait_for_shutdown(&mut command_rx, &self.metrics) => None,
            };
            let Some(result) = dialed else {
                debug!("Shutdown requested while dialing");
                break;
            };

            match result {
                Ok((ws_stream, _)) => {
                    let opened = !self.is_shutdown()
                        && self
                            .state
                            .transition_if(
                                |s| {
                                    matches!(
                                        s,
                                        ConnectionState::Connecting | ConnectionState::Reconnecting
                                    )
                                },
                                ConnectionState::Open,
                            )
                            .is_ok();
                    if !opened {
                        debug!("Opened after shutdown, closing immediately");
                        let mut ws_stream = ws_stream;
                        let _ = ws_stream.close(None).await;
                        break;
                    }

                    info!(url = %self.config.url, "Connected");
                    tracker.on_open();
                    self.emit(ClientEvent::Connected);
                    self.config.handler.on_connection_change(true);
                    if let Some(tx) = opened_tx.take() {
                        let _ = tx.send(Ok(()));
                    }

                    let outcome = self.serve(ws_stream, &mut command_rx).await;
                    // Leave Open before observers hear about the close
                    let after = if outcome.is_ok() {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::Reconnecting
                    };
                    self.set_unless_closed(after);
                    self.config.handler.on_connection_change(false);

                    match outcome {
                        Ok(()) => {
                            debug!("Connection closed on request");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Connection lost");
                            self.emit(ClientEvent::Error(e.to_string()));
                            self.emit(ClientEvent::Disconnected);
                        }
                    }
                }
                Err(e) => {
                    error!(url = %self.config.url, error = %e, "Failed to connect");
                    self.emit(ClientEvent::Error(e.to_string()));
                    if let Some(tx) = opened_tx.take() {
                        let _ = tx.send(Err(SocketError::Connect(e.to_string())));
                    }
                }
            }

            if self.is_shutdown() {
                break;
            }

            let Some(delay) = tracker.on_unexpected_close() else {
                error!(
                    attempts = tracker.attempts(),
                    "Max reconnection attempts reached, waiting for a manual connect"
                );
                self.set_unless_closed(ConnectionState::GaveUp);
                self.emit(ClientEvent::GaveUp(tracker.attempts()));
                break;
            };

            if !self.set_unless_closed(ConnectionState::Reconnecting) {
                break;
            }
            self.metrics.increment_reconnects();
            self.emit(ClientEvent::Reconnecting(tracker.attempts()));
            info!(
                "Reconnecting in {:?} (attempt {})",
                delay,
                tracker.attempts()
            );

            let slept = tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = wait_for_shutdown(&mut command_rx, &self.metrics) => false,
            };
            if !slept {
                debug!("Shutdown requested during reconnection delay");
                break;
            }
        }

        debug!("Connection task exiting");
    }

    /// Serve one open connection until it drops or a shutdown arrives
    ///
    /// `Ok(())` means an explicit close; any `Err` is an unexpected drop.
    async fn serve(
        &self,
        ws_stream: WsStream,
        command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    ) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        if let Some(ref auth) = self.config.auth {
            match auth.auth_message().await {
                Ok(Some(auth_msg)) => {
                    write
                        .send(ws_message_to_tungstenite(&auth_msg))
                        .await
                        .map_err(|e| SocketError::WebSocket(format!("Failed to send auth: {}", e)))?;
                    self.metrics.increment_sent();
                    debug!("Sent authentication message");
                }
                Ok(None) => debug!("No credentials available, staying unauthenticated"),
                Err(e) => warn!(error = %e, "Could not prepare authentication message"),
            }
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if let Message::Close(frame) = &msg {
                                debug!(?frame, "Close frame received");
                                continue;
                            }
                            let Some(ws_msg) = tungstenite_to_ws_message(msg) else {
                                continue;
                            };
                            self.metrics.increment_received();
                            self.route(ws_msg).await;
                        }
                        Some(Err(e)) => {
                            return Err(SocketError::WebSocket(e.to_string()));
                        }
                        None => {
                            return Err(SocketError::ConnectionClosed("Stream ended".into()));
                        }
                    }
                }

                cmd = command_rx.recv() => {
                    match cmd {
                        Some(ClientCommand::Send(msg)) => {
                            write
                                .send(ws_message_to_tungstenite(&msg))
                                .await
                                .map_err(|e| SocketError::WebSocket(e.to_string()))?;
                            self.metrics.increment_sent();
                        }
                        Some(ClientCommand::Shutdown) | None => {
                            info!("Closing connection");
                            let _ = write.close().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Parse and hand one message to the handler, inline
    async fn route(&self, ws_msg: WsMessage) {
        match self.config.router.parse(ws_msg).await {
            Ok(message) => {
                if let Err(e) = self.config.handler.handle(message) {
                    warn!(error = %e, "Handler error");
                }
            }
            Err(e) => {
                warn!(error = %e, "Dropping unparseable message");
            }
        }
    }
}

/// Resolves when a shutdown is requested; sends queued meanwhile are dropped
async fn wait_for_shutdown(
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    metrics: &AtomicMetrics,
) {
    loop {
        match command_rx.recv().await {
            Some(ClientCommand::Send(_)) => {
                metrics.increment_dropped();
                debug!("Dropping message queued while not open");
            }
            Some(ClientCommand::Shutdown) | None => return,
        }
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
