//! Chat content: persist, enrich, fan out.

use chrono::Utc;
use roomcast_protocol::{
    Envelope, MessageType, OutgoingUserMessage, StoredMessage,
    UserMessageBody,
};
use uuid::Uuid;

use crate::error::PluginError;
use crate::plugin::{ClientEnvelope, MessagePlugin};
use crate::room::RoomContext;

/// Message plugin for `USER_MESSAGE`.
///
/// The persistence call deliberately runs inline on the room's event path:
/// messages in one room are persisted in exactly the order they arrived,
/// at the cost of that room's throughput while the write is in flight.
#[derive(Debug, Default)]
pub struct UserMessagePlugin;

impl UserMessagePlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MessagePlugin for UserMessagePlugin {
    fn message_type(&self) -> MessageType {
        MessageType::UserMessage
    }

    async fn on_message(
        &self,
        room: &RoomContext,
        message: &ClientEnvelope,
    ) -> Result<(), PluginError> {
        let body: UserMessageBody = message.envelope.body()?;
        let profile = message.client.profile();

        let now = Utc::now();
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            room_id: room.room_id(),
            author: profile.user_id,
            content: body.content,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) =
            room.storage().create_message(stored.clone()).await
        {
            // Enough context to replay the message by hand.
            tracing::error!(
                room_id = %room.room_id(),
                author = %stored.author,
                message_id = %stored.id,
                error = %e,
                "failed to persist message, aborting broadcast"
            );
            return Err(e.into());
        }

        let outgoing = OutgoingUserMessage {
            message: stored,
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
        };
        let envelope =
            Envelope::from_body(MessageType::UserMessage, &outgoing)?;

        // Everyone, sender included — the enriched copy carries the id
        // and timestamp the sender doesn't have yet.
        for member in room.members() {
            room.enqueue(member, envelope.clone()).await?;
        }

        Ok(())
    }
}
