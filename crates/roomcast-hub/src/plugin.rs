//! The plugin extension points.
//!
//! Behaviors attach to three lifecycle moments — join, leave, and typed
//! messages — without the room knowing their concrete logic. Plugins are
//! wired into a [`PluginRegistry`](crate::PluginRegistry) once at startup
//! and shared read-only after that; there is no runtime plugin loading.
//!
//! Plugins run on the room's single event-processing task, one event at a
//! time, so their per-room state mutations are never interleaved. A plugin
//! that needs to block on I/O should enqueue work instead — the one
//! sanctioned exception is the persistence call in the user-message
//! plugin, which intentionally blocks that room's event path to get
//! per-room persistence ordering.

use std::sync::Arc;

use roomcast_protocol::{Envelope, MessageType};

use crate::client::Client;
use crate::error::PluginError;
use crate::room::RoomContext;

/// An inbound envelope paired with the member who sent it.
pub struct ClientEnvelope {
    pub client: Arc<Client>,
    pub envelope: Envelope,
}

/// Observes a client joining a room.
///
/// Invoked after the client is admitted to membership, so the joiner is
/// visible in `room.members()`.
#[async_trait::async_trait]
pub trait JoinPlugin: Send + Sync {
    async fn on_join(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError>;
}

/// Observes a client leaving a room.
///
/// Invoked after the client is removed from membership.
#[async_trait::async_trait]
pub trait LeavePlugin: Send + Sync {
    async fn on_leave(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError>;
}

/// Handles inbound envelopes of one message type.
#[async_trait::async_trait]
pub trait MessagePlugin: Send + Sync {
    /// The wire type this plugin subscribes to. Must be constant for the
    /// plugin's lifetime — it is read once, at registration.
    fn message_type(&self) -> MessageType;

    async fn on_message(
        &self,
        room: &RoomContext,
        message: &ClientEnvelope,
    ) -> Result<(), PluginError>;
}
