//! Per-connection handler: handshake, auth, and admission.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the handshake frame → resolve token to a profile
//!   2. Spawn the client (starts its write pump)
//!   3. Admit it to the requested room (the room owns the read pump)
//!   4. Park until the client closes
//!
//! After admission this task does no message work at all; the room actor
//! and the worker pool carry the traffic.

use std::sync::Arc;
use std::time::Duration;

use roomcast_hub::Client;
use roomcast_protocol::{ProtocolError, RoomId};
use roomcast_transport::{Connection, WebSocketConnection};
use serde::Deserialize;

use crate::RoomcastError;
use crate::auth::Authenticator;
use crate::server::ServerState;

/// How long a freshly accepted connection gets to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// The first frame a client must send: who they are and where they're
/// going.
#[derive(Debug, Clone, Deserialize)]
pub struct Handshake {
    pub token: String,
    pub room_id: RoomId,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A>>,
) -> Result<(), RoomcastError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let handshake = read_handshake(&conn).await?;
    let room_id = handshake.room_id;

    let profile = match state.auth.authenticate(&handshake.token).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "handshake rejected");
            let _ = conn.close().await;
            return Err(e.into());
        }
    };

    tracing::info!(
        %conn_id,
        %room_id,
        username = %profile.username,
        "client authenticated"
    );

    let client = Client::spawn(profile, Arc::new(conn));
    state.hub.add_client(room_id, Arc::clone(&client)).await?;

    // The room's read pump and the write pump own the connection from
    // here; this task just waits for the disconnect.
    client.done().await;
    tracing::debug!(%conn_id, "connection finished");
    Ok(())
}

/// Reads and decodes the handshake frame, bounded by a timeout so an
/// idle connection can't hold an accept slot open forever.
async fn read_handshake(
    conn: &WebSocketConnection,
) -> Result<Handshake, RoomcastError> {
    let data =
        match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                return Err(ProtocolError::InvalidMessage(
                    "connection closed before handshake".into(),
                )
                .into());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                let _ = conn.close().await;
                return Err(ProtocolError::InvalidMessage(
                    "handshake timed out".into(),
                )
                .into());
            }
        };

    match serde_json::from_slice(&data) {
        Ok(handshake) => Ok(handshake),
        Err(e) => {
            let _ = conn.close().await;
            Err(ProtocolError::InvalidMessage(format!(
                "bad handshake: {e}"
            ))
            .into())
        }
    }
}
