//! Room actor: an isolated Tokio task that serializes one room's events.
//!
//! Every join, leave, and inbound envelope for a room funnels through the
//! actor's single event channel and is processed one at a time in arrival
//! order. That channel is the room's serialization point: plugin state
//! mutations and persisted message ordering within a room are never
//! concurrently interleaved. Rooms are fully independent of each other —
//! there is no lock shared across rooms.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use roomcast_protocol::{Codec, Envelope, JsonCodec, RoomId};
use tokio::sync::{mpsc, oneshot};

use crate::client::{Client, ClientId};
use crate::error::{DispatchError, HubError, PluginError};
use crate::plugin::ClientEnvelope;
use crate::registry::PluginRegistry;
use crate::storage::Storage;
use crate::workers::WriteJob;

/// Events sent to a room actor through its channel.
pub(crate) enum RoomEvent {
    /// Admit a client. The reply fires after membership insertion *and*
    /// join dispatch, so the caller observes a fully-announced join.
    Join {
        client: Arc<Client>,
        reply: oneshot::Sender<()>,
    },

    /// Remove a client. Reported by its read pump exactly once, but a
    /// duplicate must be a harmless no-op.
    Leave(Arc<Client>),

    /// An inbound envelope from a member.
    Message(ClientEnvelope),

    /// Stop the actor. Sent by the hub's sweep once the room is empty.
    Shutdown,
}

/// The per-room state plugins see: identity, membership, and the ways to
/// reach the outside world (outbound job queue, persistence).
///
/// The membership lock is held only for map access — never across a
/// dispatch call or any I/O. All mutation happens on the actor task; other
/// tasks (plugins mid-dispatch, the hub sweep) only read.
pub struct RoomContext {
    room_id: RoomId,
    members: RwLock<HashMap<ClientId, Arc<Client>>>,
    jobs: mpsc::Sender<WriteJob>,
    storage: Arc<dyn Storage>,
}

impl RoomContext {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Snapshot of the current members, in no particular order.
    pub fn members(&self) -> Vec<Arc<Client>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    /// The persistence collaborator, for plugins that store things.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Queues one outbound delivery on the worker pool.
    ///
    /// Blocks (asynchronously) while the job queue is full — this is where
    /// fan-out backpressure is applied to plugins.
    pub async fn enqueue(
        &self,
        client: Arc<Client>,
        envelope: Envelope,
    ) -> Result<(), PluginError> {
        self.jobs
            .send(WriteJob { client, envelope })
            .await
            .map_err(|_| PluginError::QueueClosed)
    }

    fn insert_member(&self, client: Arc<Client>) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client.id(), client);
    }

    /// Returns `false` if the client was not a member.
    fn remove_member(&self, client_id: ClientId) -> bool {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&client_id)
            .is_some()
    }

    fn contains_member(&self, client_id: ClientId) -> bool {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&client_id)
    }
}

/// Handle to a running room actor. Cheap to clone; the hub holds one per
/// active room.
#[derive(Clone)]
pub struct RoomHandle {
    context: Arc<RoomContext>,
    events: mpsc::Sender<RoomEvent>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.context.room_id
    }

    /// Admits a client, resolving once membership and join announcements
    /// are in place.
    pub async fn join(
        &self,
        client: Arc<Client>,
    ) -> Result<(), HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(RoomEvent::Join {
                client,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HubError::RoomUnavailable(self.room_id()))?;
        reply_rx
            .await
            .map_err(|_| HubError::RoomUnavailable(self.room_id()))
    }

    /// Requests removal of a client (fire-and-forget). The normal leave
    /// path is the client's read pump; this exists for forced removal.
    pub async fn leave(
        &self,
        client: Arc<Client>,
    ) -> Result<(), HubError> {
        self.events
            .send(RoomEvent::Leave(client))
            .await
            .map_err(|_| HubError::RoomUnavailable(self.room_id()))
    }

    pub fn member_count(&self) -> usize {
        self.context.member_count()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }

    pub(crate) async fn shutdown(&self) {
        let _ = self.events.send(RoomEvent::Shutdown).await;
    }
}

/// The internal room actor. Runs inside a Tokio task.
struct RoomActor {
    context: Arc<RoomContext>,
    registry: Arc<PluginRegistry>,
    events: mpsc::Sender<RoomEvent>,
    receiver: mpsc::Receiver<RoomEvent>,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.context.room_id;
        tracing::info!(%room_id, "room started");

        while let Some(event) = self.receiver.recv().await {
            match event {
                RoomEvent::Join { client, reply } => {
                    self.handle_join(client).await;
                    let _ = reply.send(());
                }
                RoomEvent::Leave(client) => {
                    self.handle_leave(client).await;
                }
                RoomEvent::Message(message) => {
                    self.handle_message(message).await;
                }
                RoomEvent::Shutdown => break,
            }
        }

        tracing::info!(%room_id, "room stopped");
    }

    async fn handle_join(&self, client: Arc<Client>) {
        self.context.insert_member(Arc::clone(&client));
        spawn_read_pump(
            self.events.clone(),
            Arc::clone(&client),
            self.context.room_id,
        );

        tracing::info!(
            room_id = %self.context.room_id,
            client_id = %client.id(),
            members = self.context.member_count(),
            "client joined"
        );

        // Join plugins see the already-admitted member.
        if let Err(e) =
            self.registry.dispatch_join(&self.context, &client).await
        {
            tracing::error!(
                room_id = %self.context.room_id,
                client_id = %client.id(),
                error = %e,
                "join dispatch failed"
            );
        }
    }

    async fn handle_leave(&self, client: Arc<Client>) {
        // Presence-check before mutation: a duplicate leave is a no-op.
        if !self.context.remove_member(client.id()) {
            return;
        }
        client.close().await;

        tracing::info!(
            room_id = %self.context.room_id,
            client_id = %client.id(),
            members = self.context.member_count(),
            "client left"
        );

        if let Err(e) =
            self.registry.dispatch_leave(&self.context, &client).await
        {
            tracing::error!(
                room_id = %self.context.room_id,
                client_id = %client.id(),
                error = %e,
                "leave dispatch failed"
            );
        }
    }

    async fn handle_message(&self, message: ClientEnvelope) {
        if !self.context.contains_member(message.client.id()) {
            tracing::warn!(
                room_id = %self.context.room_id,
                client_id = %message.client.id(),
                "message from non-member, ignoring"
            );
            return;
        }

        if let Err(e) = self
            .registry
            .dispatch_message(&self.context, &message)
            .await
        {
            match e {
                DispatchError::Unregistered(_) => tracing::error!(
                    room_id = %self.context.room_id,
                    client_id = %message.client.id(),
                    error = %e,
                    "dropping message"
                ),
                DispatchError::Plugins(_) => tracing::error!(
                    room_id = %self.context.room_id,
                    client_id = %message.client.id(),
                    error = %e,
                    "message dispatch failed"
                ),
            }
        }
    }
}

/// Reads envelopes off one member's connection and feeds them to the room.
///
/// Any transport error, including a frame that isn't a well-formed
/// envelope, closes the connection and reports exactly one leave.
/// Payload-level decode problems are *not* handled here; those belong to
/// plugins and don't cost the connection.
fn spawn_read_pump(
    events: mpsc::Sender<RoomEvent>,
    client: Arc<Client>,
    room_id: RoomId,
) {
    tokio::spawn(async move {
        let codec = JsonCodec;
        let conn = client.connection();

        loop {
            match conn.recv().await {
                Ok(Some(data)) => {
                    match codec.decode::<Envelope>(&data) {
                        Ok(envelope) => {
                            let message = ClientEnvelope {
                                client: Arc::clone(&client),
                                envelope,
                            };
                            if events
                                .send(RoomEvent::Message(message))
                                .await
                                .is_err()
                            {
                                // Room reaped; nothing left to notify.
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::info!(
                                %room_id,
                                client_id = %client.id(),
                                error = %e,
                                "malformed envelope, closing connection"
                            );
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        %room_id,
                        client_id = %client.id(),
                        "client disconnected"
                    );
                    break;
                }
                Err(e) => {
                    tracing::info!(
                        %room_id,
                        client_id = %client.id(),
                        error = %e,
                        "read failed, closing connection"
                    );
                    break;
                }
            }
        }

        client.close().await;
        let _ = events.send(RoomEvent::Leave(client)).await;
    });
}

/// Spawns a new room actor and returns a handle to it.
///
/// `channel_size` bounds the event channel: if a room's single consumer
/// falls behind, its members' read pumps wait rather than piling up
/// unprocessed events.
pub(crate) fn spawn_room(
    room_id: RoomId,
    registry: Arc<PluginRegistry>,
    storage: Arc<dyn Storage>,
    jobs: mpsc::Sender<WriteJob>,
    channel_size: usize,
) -> RoomHandle {
    let (events_tx, events_rx) = mpsc::channel(channel_size);

    let context = Arc::new(RoomContext {
        room_id,
        members: RwLock::new(HashMap::new()),
        jobs,
        storage,
    });

    let actor = RoomActor {
        context: Arc::clone(&context),
        registry,
        events: events_tx.clone(),
        receiver: events_rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        context,
        events: events_tx,
    }
}
