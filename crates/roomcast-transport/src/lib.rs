//! Transport abstraction layer for Roomcast.
//!
//! Provides the [`Connection`] and [`Transport`] traits that abstract over
//! the wire technology. The hub never touches sockets directly — it holds
//! an `Arc<dyn Connection>` per client, which is why [`Connection`] is a
//! dyn-safe `async_trait` with a concrete error type.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{ShutdownHandle, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that can send and receive whole messages.
///
/// Implementations must tolerate `send` and `recv` being called
/// concurrently from different tasks: the hub runs one read pump and one
/// write pump per connection, and they must never block each other.
#[async_trait::async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Sends one message to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection. Safe to call more than once.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Accepts new incoming connections.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(
        &mut self,
    ) -> Result<Self::Connection, TransportError>;

    /// Returns the local address the transport is bound to.
    fn local_addr(&self) -> Result<std::net::SocketAddr, TransportError>;

    /// Stops the transport from accepting further connections.
    ///
    /// A pending or later `accept` call returns
    /// [`TransportError::Shutdown`]. Established connections are not
    /// affected.
    async fn shutdown(&self) -> Result<(), TransportError>;
}
