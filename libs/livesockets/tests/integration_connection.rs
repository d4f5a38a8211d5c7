//! Integration tests for connection lifecycle against a local mock server

mod common;

use common::fixtures::{recording, RecordingHandler, StateRecorder, StaticAuth, TextRouter};
use common::{wait_until, MockWsServer, ServerMode};
use livesockets::*;
use std::sync::Arc;
use std::time::Duration;

fn client_for(url: &str, handler: &Arc<RecordingHandler>) -> WebSocketClient<TextRouter> {
    let handler: Arc<dyn MessageHandler<String>> = handler.clone();
    livesockets::builder()
        .url(url)
        .router(TextRouter, handler)
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(50), Some(5)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_connect_send_and_echo() {
    verbose_println!("Testing connect + echo...");
    let server = MockWsServer::start().await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    assert_eq!(client.connection_state(), ConnectionState::Idle);
    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert_eq!(client.try_recv_event(), Some(ClientEvent::Connected));

    client.send(WsMessage::from("hello")).unwrap();
    assert!(wait_until(Duration::from_secs(2), || handler.messages.lock().len() == 1).await);
    assert_eq!(handler.messages.lock()[0], "hello");
    assert_eq!(client.metrics().messages_sent, 1);

    client.disconnect();
}

#[tokio::test]
async fn test_connect_while_open_is_a_no_op() {
    let server = MockWsServer::start().await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    client.connect().await.unwrap();
    client.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.accepts(), 1);
    client.disconnect();
}

#[tokio::test]
async fn test_overlapping_connect_is_refused() {
    let server = MockWsServer::start().await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    let (first, second) = tokio::join!(client.connect(), client.connect());
    assert!(first.is_ok());
    assert_eq!(second, Err(SocketError::ConnectionInProgress));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.accepts(), 1);
    client.disconnect();
}

#[tokio::test]
async fn test_send_while_not_open_is_dropped() {
    let handler = recording();
    let client = client_for("ws://127.0.0.1:9", &handler);

    assert_eq!(
        client.send(WsMessage::from("lost")),
        Err(SocketError::NotConnected)
    );
    assert_eq!(client.metrics().messages_dropped, 1);
    assert_eq!(client.metrics().messages_sent, 0);
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_final() {
    let server = MockWsServer::start().await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    // Before any connect
    client.disconnect();
    assert_eq!(client.connection_state(), ConnectionState::Idle);

    client.connect().await.unwrap();
    client.disconnect();
    client.disconnect();
    assert_eq!(client.connection_state(), ConnectionState::Closed);

    assert!(wait_until(Duration::from_secs(2), || handler.changes.lock().len() == 2).await);
    assert_eq!(*handler.changes.lock(), vec![true, false]);

    // No reconnection after an explicit close
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.accepts(), 1);
    assert_eq!(client.connection_state(), ConnectionState::Closed);
    assert!(client.send(WsMessage::from("late")).is_err());
}

#[tokio::test]
async fn test_reconnect_after_explicit_close() {
    let server = MockWsServer::start().await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    client.connect().await.unwrap();
    client.disconnect();
    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert_eq!(server.accepts(), 2);
    client.disconnect();
}

#[tokio::test]
async fn test_auth_message_is_first_frame() {
    let server = MockWsServer::start().await;
    let handler = recording();
    let handler_dyn: Arc<dyn MessageHandler<String>> = handler.clone();
    let client = livesockets::builder()
        .url(server.ws_url())
        .router(TextRouter, handler_dyn)
        .auth(StaticAuth(r#"{"type":"auth","token":"t"}"#))
        .build()
        .unwrap();

    client.connect().await.unwrap();
    client.send(WsMessage::from("after-auth")).unwrap();

    assert!(wait_until(Duration::from_secs(2), || server.received().len() == 2).await);
    let received = server.received();
    assert_eq!(received[0], r#"{"type":"auth","token":"t"}"#);
    assert_eq!(received[1], "after-auth");
    client.disconnect();
}

#[tokio::test]
async fn test_inbound_frames_keep_arrival_order() {
    let frames: Vec<String> = (0..20).map(|i| format!("frame-{}", i)).collect();
    let server = MockWsServer::start_with(ServerMode::Script(frames.clone())).await;
    let handler = recording();
    let client = client_for(&server.ws_url(), &handler);

    client.connect().await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || handler.messages.lock().len() == 20).await);
    assert_eq!(*handler.messages.lock(), frames);
    client.disconnect();
}

#[tokio::test]
async fn test_state_has_left_open_when_handler_hears_close() {
    let server = MockWsServer::start_with(ServerMode::CloseAfterHandshake).await;
    let recorder = Arc::new(StateRecorder::default());
    let handler: Arc<dyn MessageHandler<String>> = recorder.clone();
    let client = Arc::new(
        livesockets::builder()
            .url(server.ws_url())
            .router(TextRouter, handler)
            .reconnect_strategy(NeverReconnect)
            .build()
            .unwrap(),
    );
    let _ = recorder.client.set(Arc::downgrade(&client));

    client.connect().await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || recorder.seen.lock().len() == 2).await);

    let seen = recorder.seen.lock().clone();
    assert_eq!(seen[0], (true, ConnectionState::Open));
    assert!(!seen[1].0);
    assert_ne!(seen[1].1, ConnectionState::Open);
    assert!(wait_until(Duration::from_secs(2), || client.connection_state() == ConnectionState::GaveUp).await);
}

#[test]
fn test_build_rejects_non_websocket_url() {
    let handler: Arc<dyn MessageHandler<String>> = recording();
    let result = livesockets::builder()
        .url("http://localhost:8080/ws")
        .router(TextRouter, handler)
        .build();

    assert!(matches!(result, Err(SocketError::Configuration(_))));
}
