//! Ephemeral typing indicators with TTL expiry.
//!
//! The plugin owns its state: a map from room id to the members currently
//! typing in it, each entry stamped with its last refresh. Entries die
//! three ways — explicitly on leave, by being overwritten on refresh, or
//! via the periodic sweep once older than the timeout. Keying by room id
//! (not room object identity) means state survives a room being reaped
//! and recreated, and reaped rooms' leftovers simply age out.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Instant;

use roomcast_protocol::{
    Envelope, MessageType, Profile, RoomId, TypingProfiles,
    TypingStatusBody,
};

use crate::client::{Client, ClientId};
use crate::config::TypingStatusConfig;
use crate::error::PluginError;
use crate::plugin::{
    ClientEnvelope, JoinPlugin, LeavePlugin, MessagePlugin,
};
use crate::room::RoomContext;

struct TypingEntry {
    profile: Profile,
    refreshed_at: Instant,
}

type TypingMap = HashMap<RoomId, HashMap<ClientId, TypingEntry>>;

/// Message + join + leave plugin for `TYPING_STATUS`.
pub struct TypingStatusPlugin {
    typing: Arc<RwLock<TypingMap>>,
    config: TypingStatusConfig,
}

impl TypingStatusPlugin {
    /// Creates the plugin and starts its expiry sweep. The sweep holds
    /// only a weak reference to the state, so it stops once the last
    /// registry referencing the plugin is dropped.
    pub fn spawn(config: TypingStatusConfig) -> Arc<Self> {
        let typing: Arc<RwLock<TypingMap>> = Arc::default();

        tokio::spawn(cleanup_loop(
            Arc::downgrade(&typing),
            config.clone(),
        ));

        Arc::new(Self { typing, config })
    }

    /// The profiles currently typing in `room_id`, excluding `except`
    /// (nobody needs their own typing indicator).
    pub fn typing_profiles(
        &self,
        room_id: RoomId,
        except: ClientId,
    ) -> Vec<Profile> {
        let typing =
            self.typing.read().unwrap_or_else(PoisonError::into_inner);
        let Some(clients) = typing.get(&room_id) else {
            return Vec::new();
        };

        clients
            .iter()
            .filter(|(id, entry)| {
                **id != except
                    && entry.refreshed_at.elapsed() <= self.config.timeout
            })
            .map(|(_, entry)| entry.profile.clone())
            .collect()
    }

    fn set_typing(
        &self,
        room_id: RoomId,
        client_id: ClientId,
        profile: Profile,
    ) {
        self.typing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(room_id)
            .or_default()
            .insert(
                client_id,
                TypingEntry {
                    profile,
                    refreshed_at: Instant::now(),
                },
            );
    }

    fn clear_typing(&self, room_id: RoomId, client_id: ClientId) {
        let mut typing =
            self.typing.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(clients) = typing.get_mut(&room_id) {
            clients.remove(&client_id);
            if clients.is_empty() {
                typing.remove(&room_id);
            }
        }
    }
}

#[async_trait::async_trait]
impl MessagePlugin for TypingStatusPlugin {
    fn message_type(&self) -> MessageType {
        MessageType::TypingStatus
    }

    /// Records the sender as typing and relays the indicator to everyone
    /// else in the room.
    async fn on_message(
        &self,
        room: &RoomContext,
        message: &ClientEnvelope,
    ) -> Result<(), PluginError> {
        let body: TypingStatusBody = message.envelope.body()?;

        self.set_typing(
            room.room_id(),
            message.client.id(),
            body.profile.clone(),
        );

        let indicator = Envelope::from_body(
            MessageType::TypingStatus,
            &TypingProfiles {
                profiles: vec![body.profile],
            },
        )?;

        for member in room.members() {
            if member.id() != message.client.id() {
                room.enqueue(member, indicator.clone()).await?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl JoinPlugin for TypingStatusPlugin {
    /// Catches a joiner up on who is mid-keystroke, if anyone.
    async fn on_join(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError> {
        let profiles =
            self.typing_profiles(room.room_id(), client.id());
        if profiles.is_empty() {
            return Ok(());
        }

        let envelope = Envelope::from_body(
            MessageType::TypingStatus,
            &TypingProfiles { profiles },
        )?;
        room.enqueue(Arc::clone(client), envelope).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl LeavePlugin for TypingStatusPlugin {
    async fn on_leave(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError> {
        self.clear_typing(room.room_id(), client.id());
        Ok(())
    }
}

/// Expires stale entries and discards emptied room slots. Independent of
/// room lifecycle. The first pass runs one full interval in, so a fresh
/// entry is never swept the moment the task starts.
async fn cleanup_loop(
    typing: Weak<RwLock<TypingMap>>,
    config: TypingStatusConfig,
) {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + config.cleanup_interval,
        config.cleanup_interval,
    );
    loop {
        ticker.tick().await;
        let Some(typing) = typing.upgrade() else { break };

        let mut typing =
            typing.write().unwrap_or_else(PoisonError::into_inner);
        typing.retain(|_, clients| {
            clients.retain(|_, entry| {
                entry.refreshed_at.elapsed() <= config.timeout
            });
            !clients.is_empty()
        });
    }
}
