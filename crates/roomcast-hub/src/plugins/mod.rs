//! The behaviors shipped with the hub: presence announcements, typing
//! indicators, and chat-message persistence/fan-out.

mod presence;
mod typing_status;
mod user_message;

pub use presence::PresencePlugin;
pub use typing_status::TypingStatusPlugin;
pub use user_message::UserMessagePlugin;

use std::sync::Arc;

use crate::config::TypingStatusConfig;
use crate::registry::PluginRegistry;

/// Wires the standard plugin set into a fresh registry.
///
/// The typing plugin participates in all three lifecycle points, so one
/// instance is registered under each.
pub fn standard_registry(
    typing_config: TypingStatusConfig,
) -> PluginRegistry {
    let mut registry = PluginRegistry::new();

    let presence = Arc::new(PresencePlugin::new());
    registry.register_join_plugin(Arc::clone(&presence) as _);
    registry.register_leave_plugin(presence as _);

    let typing = TypingStatusPlugin::spawn(typing_config);
    registry.register_message_plugin(Arc::clone(&typing) as _);
    registry.register_join_plugin(Arc::clone(&typing) as _);
    registry.register_leave_plugin(typing as _);

    registry.register_message_plugin(Arc::new(UserMessagePlugin::new()));

    registry
}
