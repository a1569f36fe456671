//! Presence: who is in the room, announced on every membership change.

use std::sync::Arc;

use roomcast_protocol::{
    Envelope, MessageType, PresenceAction, PresenceUpdate, Profile,
};

use crate::client::Client;
use crate::error::PluginError;
use crate::plugin::{JoinPlugin, LeavePlugin};
use crate::room::RoomContext;

/// Join/leave plugin that keeps members informed of the room roster.
///
/// Stateless: the roster is always read fresh from the room's membership,
/// which the dispatching actor has already updated.
#[derive(Debug, Default)]
pub struct PresencePlugin;

impl PresencePlugin {
    pub fn new() -> Self {
        Self
    }
}

fn presence_envelope(
    profiles: Vec<Profile>,
    action: PresenceAction,
) -> Result<Envelope, PluginError> {
    Envelope::from_body(
        MessageType::Presence,
        &PresenceUpdate { profiles, action },
    )
    .map_err(PluginError::from)
}

#[async_trait::async_trait]
impl JoinPlugin for PresencePlugin {
    /// Sends the joiner a snapshot of who was already present (possibly
    /// empty — the joiner always learns the roster), then announces the
    /// joiner to every pre-existing member. The joiner never receives its
    /// own join announcement.
    async fn on_join(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError> {
        let members = room.members();

        let already_present: Vec<Profile> = members
            .iter()
            .filter(|m| m.id() != client.id())
            .map(|m| m.profile().clone())
            .collect();

        let snapshot = presence_envelope(
            already_present,
            PresenceAction::Join,
        )?;
        room.enqueue(Arc::clone(client), snapshot).await?;

        let announcement = presence_envelope(
            vec![client.profile().clone()],
            PresenceAction::Join,
        )?;
        for member in members {
            if member.id() != client.id() {
                room.enqueue(member, announcement.clone()).await?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl LeavePlugin for PresencePlugin {
    /// Announces the departure to the remaining members. The leaver is
    /// already out of the membership set, so no exclusion is needed.
    async fn on_leave(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), PluginError> {
        let departure = presence_envelope(
            vec![client.profile().clone()],
            PresenceAction::Leave,
        )?;

        for member in room.members() {
            room.enqueue(member, departure.clone()).await?;
        }

        Ok(())
    }
}
