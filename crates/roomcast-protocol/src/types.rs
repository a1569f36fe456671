//! Core protocol types for Roomcast's wire format.
//!
//! Everything here either travels on the wire as JSON or is the persisted
//! shape a broadcast is enriched into before fan-out. The envelope is a
//! discriminated `{type, payload}` pair: `type` selects which plugins see
//! the message, `payload` is an opaque, type-specific body that only those
//! plugins know how to decode.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room.
///
/// Newtype over [`Uuid`]: room ids are assigned by the layer that owns
/// persistent rooms (outside this engine) and are opaque here. The wrapper
/// keeps them from being confused with user or message ids, which are also
/// UUIDs underneath.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Creates a fresh random room id. Convenience for tests and demos;
    /// production ids come from the room store.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The discriminant of a wire message.
///
/// The three known types map to the plugins shipped with the hub. The
/// `Other` variant is deliberate: an envelope with an unknown type must
/// still *decode* so the dispatch layer can log a configuration error
/// naming the offending type, rather than treating it as a malformed frame.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum MessageType {
    /// A chat message authored by a member (persisted and fanned out).
    #[serde(rename = "USER_MESSAGE")]
    UserMessage,
    /// A membership change announcement (outbound only).
    #[serde(rename = "PRESENCE")]
    Presence,
    /// An ephemeral "someone is typing" indicator.
    #[serde(rename = "TYPING_STATUS")]
    TypingStatus,
    /// Any type string this build doesn't know about.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserMessage => f.write_str("USER_MESSAGE"),
            Self::Presence => f.write_str("PRESENCE"),
            Self::TypingStatus => f.write_str("TYPING_STATUS"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// The unit exchanged over a connection: `{ "type": ..., "payload": ... }`.
///
/// The payload stays as raw JSON here; decoding it into a concrete body is
/// the responsibility of whichever plugin handles this `message_type`. A
/// payload that fails to decode is a plugin-level error — the envelope
/// itself was still well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Builds an envelope by serializing `body` into the payload slot.
    pub fn from_body<T: Serialize>(
        message_type: MessageType,
        body: &T,
    ) -> Result<Self, crate::ProtocolError> {
        let payload = serde_json::to_value(body)
            .map_err(crate::ProtocolError::Encode)?;
        Ok(Self {
            message_type,
            payload,
        })
    }

    /// Decodes the payload into a concrete body type.
    pub fn body<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, crate::ProtocolError> {
        serde_json::from_value(self.payload.clone())
            .map_err(crate::ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A member's identity metadata, resolved by the caller before admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A chat message in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub room_id: RoomId,
    pub author: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payload bodies
// ---------------------------------------------------------------------------

/// Inbound `USER_MESSAGE` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageBody {
    pub content: String,
}

/// Outbound `USER_MESSAGE` payload: the persisted message enriched with
/// the author's display metadata, so clients don't need a profile lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingUserMessage {
    #[serde(flatten)]
    pub message: StoredMessage,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Whether a presence update announces an arrival or a departure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
pub enum PresenceAction {
    #[serde(rename = "JOIN")]
    Join,
    #[serde(rename = "LEAVE")]
    Leave,
}

/// Outbound `PRESENCE` payload.
///
/// On a join, the new member receives the full set of already-present
/// profiles; everyone else receives just the joiner. On a leave, the
/// remaining members receive just the leaver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub profiles: Vec<Profile>,
    pub action: PresenceAction,
}

/// Inbound `TYPING_STATUS` payload: who is typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStatusBody {
    pub profile: Profile,
}

/// Outbound `TYPING_STATUS` payload: the currently-typing profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingProfiles {
    pub profiles: Vec<Profile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_message_type_known_round_trip() {
        let json = serde_json::to_string(&MessageType::UserMessage).unwrap();
        assert_eq!(json, "\"USER_MESSAGE\"");
        let back: MessageType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MessageType::UserMessage);
    }

    #[test]
    fn test_message_type_unknown_decodes_as_other() {
        let ty: MessageType = serde_json::from_str("\"VIDEO_CALL\"").unwrap();
        assert_eq!(ty, MessageType::Other("VIDEO_CALL".to_string()));
        assert_eq!(ty.to_string(), "VIDEO_CALL");
    }

    #[test]
    fn test_envelope_uses_type_field_name() {
        let env = Envelope::from_body(
            MessageType::TypingStatus,
            &TypingStatusBody {
                profile: profile("ada"),
            },
        )
        .unwrap();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "TYPING_STATUS");
        assert!(json["payload"]["profile"]["username"].is_string());
    }

    #[test]
    fn test_envelope_body_round_trip() {
        let body = UserMessageBody {
            content: "hello".to_string(),
        };
        let env =
            Envelope::from_body(MessageType::UserMessage, &body).unwrap();
        let back: UserMessageBody = env.body().unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn test_envelope_body_mismatch_is_decode_error() {
        let env = Envelope {
            message_type: MessageType::UserMessage,
            payload: serde_json::json!({"nope": 1}),
        };
        assert!(env.body::<UserMessageBody>().is_err());
    }

    #[test]
    fn test_presence_action_rename() {
        let json = serde_json::to_string(&PresenceAction::Leave).unwrap();
        assert_eq!(json, "\"LEAVE\"");
    }

    #[test]
    fn test_outgoing_user_message_flattens_stored_fields() {
        let msg = OutgoingUserMessage {
            message: StoredMessage {
                id: Uuid::new_v4(),
                room_id: RoomId::random(),
                author: Uuid::new_v4(),
                content: "hi".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            username: "ada".to_string(),
            first_name: None,
            last_name: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        // Flattened: no nested "message" object on the wire.
        assert!(json.get("message").is_none());
        assert_eq!(json["content"], "hi");
        assert_eq!(json["username"], "ada");
    }
}
