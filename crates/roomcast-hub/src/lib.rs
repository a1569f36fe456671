//! The Roomcast engine: rooms, clients, fan-out, and plugins.
//!
//! The hub groups persistent bidirectional connections into rooms and fans
//! messages out to room members. Each room runs as an isolated actor task
//! whose single event channel serializes all membership and message
//! processing; outbound delivery is bounded by a fixed worker pool; and
//! independent behaviors attach to the join/leave/message lifecycle
//! through the plugin registry without the broker knowing their logic.
//!
//! # Key types
//!
//! - [`Hub`] — room registry; entry point via [`Hub::add_client`]
//! - [`Client`] — one connection plus its resolved [`Profile`](roomcast_protocol::Profile)
//! - [`RoomContext`] — the per-room state plugins operate on
//! - [`PluginRegistry`] + [`JoinPlugin`]/[`LeavePlugin`]/[`MessagePlugin`]
//!   — the extension points
//! - [`Storage`] — the narrow persistence boundary
//!
//! Everything in-process and in-memory: durable ordering across restarts
//! and multi-node fan-out are explicitly not this crate's problem.

mod client;
mod config;
mod error;
mod hub;
mod plugin;
mod plugins;
mod registry;
mod room;
mod storage;
mod workers;

pub use client::{Client, ClientId};
pub use config::{HubConfig, TypingStatusConfig};
pub use error::{DispatchError, HubError, PluginError};
pub use hub::Hub;
pub use plugin::{
    ClientEnvelope, JoinPlugin, LeavePlugin, MessagePlugin,
};
pub use plugins::{
    PresencePlugin, TypingStatusPlugin, UserMessagePlugin,
    standard_registry,
};
pub use registry::PluginRegistry;
pub use room::{RoomContext, RoomHandle};
pub use storage::{MemoryStorage, Storage, StorageError};
pub use workers::WriteJob;
