//! A minimal chat server with in-memory persistence and open admission.
//!
//! Run with `cargo run --example chat_server`, then connect a WebSocket
//! client and send `{"token": "<username>", "room_id": "<uuid>"}`.

use std::sync::Arc;

use roomcast::prelude::*;
use uuid::Uuid;

/// Accepts any non-empty token and uses it as the username.
///
/// Development only: a real deployment validates a session token and
/// looks the profile up.
struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(
        &self,
        token: &str,
    ) -> Result<Profile, AuthError> {
        if token.is_empty() {
            return Err(AuthError::new("empty token"));
        }
        Ok(Profile {
            user_id: Uuid::new_v4(),
            username: token.to_string(),
            first_name: None,
            last_name: None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), RoomcastError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("ROOMCAST_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = RoomcastServerBuilder::new()
        .bind(&addr)
        .build(DevAuthenticator, Arc::new(MemoryStorage::new()))
        .await?;

    tracing::info!(%addr, "chat server listening");
    server.run().await
}
