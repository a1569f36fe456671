//! Integration tests for the Roomcast server: handshake, auth, and a
//! full two-client chat flow over real WebSockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomcast::prelude::*;
use roomcast_protocol::{
    OutgoingUserMessage, PresenceAction, PresenceUpdate,
    UserMessageBody,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

// =========================================================================
// Mock authenticator
// =========================================================================

/// Treats the token as the username; rejects the literal "bad-token".
struct TokenIsUsername;

impl Authenticator for TokenIsUsername {
    async fn authenticate(
        &self,
        token: &str,
    ) -> Result<Profile, AuthError> {
        if token == "bad-token" {
            return Err(AuthError::new("unknown token"));
        }
        Ok(Profile {
            user_id: Uuid::new_v4(),
            username: token.to_string(),
            first_name: None,
            last_name: None,
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

async fn start_server() -> (SocketAddr, Arc<Hub>) {
    let server = RoomcastServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(TokenIsUsername, Arc::new(MemoryStorage::new()))
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("bound address");
    let hub = server.hub();
    tokio::spawn(server.run());
    (addr, hub)
}

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(
    addr: SocketAddr,
    token: &str,
    room_id: RoomId,
) -> WsClient {
    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("connect should succeed");
    let handshake = serde_json::json!({
        "token": token,
        "room_id": room_id,
    });
    ws.send(Message::Text(handshake.to_string().into()))
        .await
        .expect("handshake send");
    ws
}

/// Reads frames until one decodes to an envelope of the wanted type.
async fn recv_of(ws: &mut WsClient, wanted: MessageType) -> Envelope {
    loop {
        let frame = tokio::time::timeout(
            Duration::from_secs(2),
            ws.next(),
        )
        .await
        .expect("timed out waiting for a frame")
        .expect("connection ended")
        .expect("websocket error");
        let Message::Text(text) = frame else { continue };
        let envelope: Envelope =
            serde_json::from_str(&text).expect("decode envelope");
        if envelope.message_type == wanted {
            return envelope;
        }
    }
}

/// Resolves once the stream ends or the server sends a close frame.
async fn expect_closed(ws: &mut WsClient) {
    let outcome =
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => return,
                    _ => {}
                }
            }
        })
        .await;
    assert!(outcome.is_ok(), "expected the server to close");
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_handshake_admits_client_to_room() {
    let (addr, hub) = start_server().await;
    let room_id = RoomId::random();

    let mut ws = connect(addr, "alice", room_id).await;

    let snapshot: PresenceUpdate = recv_of(&mut ws, MessageType::Presence)
        .await
        .body()
        .expect("presence body");
    assert_eq!(snapshot.action, PresenceAction::Join);
    assert!(snapshot.profiles.is_empty());
    assert_eq!(hub.room_count().await, 1);
}

#[tokio::test]
async fn test_two_clients_exchange_messages() {
    let (addr, _hub) = start_server().await;
    let room_id = RoomId::random();

    let mut alice = connect(addr, "alice", room_id).await;
    recv_of(&mut alice, MessageType::Presence).await;

    let mut bob = connect(addr, "bob", room_id).await;
    recv_of(&mut bob, MessageType::Presence).await;

    let envelope = Envelope::from_body(
        MessageType::UserMessage,
        &UserMessageBody {
            content: "hello from alice".to_string(),
        },
    )
    .unwrap();
    alice
        .send(Message::Text(
            serde_json::to_string(&envelope).unwrap().into(),
        ))
        .await
        .unwrap();

    for ws in [&mut alice, &mut bob] {
        let received: OutgoingUserMessage =
            recv_of(ws, MessageType::UserMessage)
                .await
                .body()
                .expect("user message body");
        assert_eq!(received.message.content, "hello from alice");
        assert_eq!(received.username, "alice");
        assert_eq!(received.message.room_id, room_id);
    }
}

#[tokio::test]
async fn test_shutdown_stops_accepting_but_keeps_live_connections() {
    let server = RoomcastServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(TokenIsUsername, Arc::new(MemoryStorage::new()))
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("bound address");
    let shutdown = server.shutdown_handle();
    let running = tokio::spawn(server.run());

    let room_id = RoomId::random();
    let mut alice = connect(addr, "alice", room_id).await;
    recv_of(&mut alice, MessageType::Presence).await;

    shutdown.shutdown();
    let outcome =
        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("run should return after shutdown")
            .expect("task should complete");
    assert!(outcome.is_ok(), "run should exit cleanly: {outcome:?}");

    // The client admitted before shutdown still gets service.
    let envelope = Envelope::from_body(
        MessageType::UserMessage,
        &UserMessageBody {
            content: "still here".to_string(),
        },
    )
    .unwrap();
    alice
        .send(Message::Text(
            serde_json::to_string(&envelope).unwrap().into(),
        ))
        .await
        .unwrap();
    let received: OutgoingUserMessage =
        recv_of(&mut alice, MessageType::UserMessage)
            .await
            .body()
            .expect("user message body");
    assert_eq!(received.message.content, "still here");

    // The listener is gone, so new connections are refused.
    let refused =
        tokio_tungstenite::connect_async(format!("ws://{addr}")).await;
    assert!(refused.is_err(), "no new connections after shutdown");
}

#[tokio::test]
async fn test_rejected_token_closes_connection() {
    let (addr, hub) = start_server().await;
    let room_id = RoomId::random();

    let mut ws = connect(addr, "bad-token", room_id).await;
    expect_closed(&mut ws).await;
    assert_eq!(hub.room_count().await, 0);
}

#[tokio::test]
async fn test_malformed_handshake_closes_connection() {
    let (addr, hub) = start_server().await;

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("connect should succeed");
    ws.send(Message::Text("not a handshake".to_string().into()))
        .await
        .unwrap();
    expect_closed(&mut ws).await;
    assert_eq!(hub.room_count().await, 0);
}
