//! Wire protocol for Roomcast.
//!
//! This crate defines the "language" that clients and the broker speak:
//!
//! - **Types** ([`Envelope`], [`MessageType`], [`Profile`], etc.) — the
//!   structures that travel on the wire, plus the persisted message model.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the hub
//! (rooms, clients, plugins). It doesn't know about connections or rooms —
//! it only knows how to describe and serialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Hub (room / plugin dispatch)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Envelope, MessageType, OutgoingUserMessage, PresenceAction,
    PresenceUpdate, Profile, RoomId, StoredMessage, TypingProfiles,
    TypingStatusBody, UserMessageBody,
};
