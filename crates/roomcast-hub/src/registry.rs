//! Routes lifecycle events to every plugin registered for them.

use std::collections::HashMap;
use std::sync::Arc;

use roomcast_protocol::MessageType;

use crate::client::Client;
use crate::error::DispatchError;
use crate::plugin::{
    ClientEnvelope, JoinPlugin, LeavePlugin, MessagePlugin,
};
use crate::room::RoomContext;

/// The plugin wiring, built once at startup.
///
/// Registration happens on `&mut self` before the registry is shared as an
/// `Arc` — after that it is read-only, so dispatch needs no locking.
/// Message plugins are keyed by type and kept in registration order; join
/// and leave plugins are unordered sets.
#[derive(Default)]
pub struct PluginRegistry {
    message_plugins: HashMap<MessageType, Vec<Arc<dyn MessagePlugin>>>,
    join_plugins: Vec<Arc<dyn JoinPlugin>>,
    leave_plugins: Vec<Arc<dyn LeavePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a message plugin under its declared type.
    pub fn register_message_plugin(
        &mut self,
        plugin: Arc<dyn MessagePlugin>,
    ) {
        self.message_plugins
            .entry(plugin.message_type())
            .or_default()
            .push(plugin);
    }

    pub fn register_join_plugin(&mut self, plugin: Arc<dyn JoinPlugin>) {
        self.join_plugins.push(plugin);
    }

    pub fn register_leave_plugin(
        &mut self,
        plugin: Arc<dyn LeavePlugin>,
    ) {
        self.leave_plugins.push(plugin);
    }

    /// Invokes every join plugin. Individual failures are collected, never
    /// short-circuiting — one misbehaving plugin can't keep its siblings
    /// from observing the event.
    pub async fn dispatch_join(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), DispatchError> {
        let mut failures = Vec::new();
        for plugin in &self.join_plugins {
            if let Err(e) = plugin.on_join(room, client).await {
                failures.push(e);
            }
        }
        aggregate(failures)
    }

    /// Invokes every leave plugin, collecting failures.
    pub async fn dispatch_leave(
        &self,
        room: &RoomContext,
        client: &Arc<Client>,
    ) -> Result<(), DispatchError> {
        let mut failures = Vec::new();
        for plugin in &self.leave_plugins {
            if let Err(e) = plugin.on_leave(room, client).await {
                failures.push(e);
            }
        }
        aggregate(failures)
    }

    /// Routes an inbound envelope to the plugins registered for its type.
    ///
    /// An envelope whose type has no plugins is a configuration error
    /// ([`DispatchError::Unregistered`]) — distinct from a plugin-internal
    /// failure — and the message is dropped.
    pub async fn dispatch_message(
        &self,
        room: &RoomContext,
        message: &ClientEnvelope,
    ) -> Result<(), DispatchError> {
        let message_type = &message.envelope.message_type;
        let plugins = self
            .message_plugins
            .get(message_type)
            .ok_or_else(|| {
                DispatchError::Unregistered(message_type.clone())
            })?;

        let mut failures = Vec::new();
        for plugin in plugins {
            if let Err(e) = plugin.on_message(room, message).await {
                failures.push(e);
            }
        }
        aggregate(failures)
    }

    /// Returns `true` if at least one plugin handles `message_type`.
    pub fn handles(&self, message_type: &MessageType) -> bool {
        self.message_plugins.contains_key(message_type)
    }
}

fn aggregate(
    failures: Vec<crate::error::PluginError>,
) -> Result<(), DispatchError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::Plugins(failures))
    }
}
