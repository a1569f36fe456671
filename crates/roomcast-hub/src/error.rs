//! Error types for the hub layer.
//!
//! Per-message and per-connection failures are never fatal here: they are
//! logged at the room actor and the room keeps running. These types exist
//! so the log lines can say precisely what went wrong.

use roomcast_protocol::{MessageType, ProtocolError, RoomId};

use crate::storage::StorageError;

/// Errors returned to callers of the hub's public operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The room's actor task is gone (reaped between lookup and delivery).
    /// `Hub::add_client` retries this internally against a fresh room; it
    /// surfaces only through direct use of a stale `RoomHandle`.
    #[error("room {0} is unavailable")]
    RoomUnavailable(RoomId),
}

/// A failure inside a single plugin invocation.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The payload didn't decode into the body this plugin expects, or an
    /// outbound body failed to encode. The connection stays open.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persistence collaborator rejected a write.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The outbound job queue is gone (hub shutting down).
    #[error("outbound job queue closed")]
    QueueClosed,
}

fn join_errors(errors: &[PluginError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The outcome of a dispatch call that didn't fully succeed.
///
/// `Unregistered` is a configuration problem (every wire type should have
/// at least one plugin); `Plugins` aggregates the individual failures so a
/// single misbehaving plugin never hides its siblings' results — all
/// registered plugins ran before this was built.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no plugins registered for message type: {0}")]
    Unregistered(MessageType),

    #[error("{} plugin(s) failed: {}", .0.len(), join_errors(.0))]
    Plugins(Vec<PluginError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_joins_plugin_failures() {
        let err = DispatchError::Plugins(vec![
            PluginError::QueueClosed,
            PluginError::Storage(StorageError::new("db down")),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 plugin(s) failed"));
        assert!(msg.contains("outbound job queue closed"));
        assert!(msg.contains("db down"));
    }

    #[test]
    fn test_unregistered_names_the_type() {
        let err = DispatchError::Unregistered(MessageType::Other(
            "VIDEO_CALL".to_string(),
        ));
        assert!(err.to_string().contains("VIDEO_CALL"));
    }
}
