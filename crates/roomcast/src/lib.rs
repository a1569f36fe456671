//! # Roomcast
//!
//! Real-time chat room server. Roomcast accepts WebSocket connections,
//! authenticates them through a pluggable [`Authenticator`], and admits
//! each one to a room run by the [`roomcast_hub`] engine: presence
//! announcements, typing indicators, and persisted chat messages fanned
//! out by a shared worker pool.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use roomcast::prelude::*;
//!
//! # struct MyAuth;
//! # impl Authenticator for MyAuth {
//! #     async fn authenticate(
//! #         &self,
//! #         _token: &str,
//! #     ) -> Result<Profile, AuthError> {
//! #         Err(AuthError::new("unimplemented"))
//! #     }
//! # }
//! # async fn run() -> Result<(), RoomcastError> {
//! let server = RoomcastServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(MyAuth, Arc::new(MemoryStorage::default()))
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! Clients open a WebSocket and send a single JSON handshake frame,
//! `{"token": "...", "room_id": "..."}`; every frame after that is a
//! `{type, payload}` envelope handled by the room's plugins.

mod auth;
mod error;
mod handler;
mod server;

pub use auth::{AuthError, Authenticator};
pub use error::RoomcastError;
pub use handler::Handshake;
pub use server::{RoomcastServer, RoomcastServerBuilder};

/// Everything a typical server binary needs in one import.
pub mod prelude {
    pub use crate::{
        AuthError, Authenticator, RoomcastError, RoomcastServer,
        RoomcastServerBuilder,
    };
    pub use roomcast_hub::{
        Hub, HubConfig, MemoryStorage, Storage, StorageError,
        TypingStatusConfig,
    };
    pub use roomcast_protocol::{
        Envelope, MessageType, Profile, RoomId,
    };
}
