//! Unified error type for the Roomcast server crate.

use roomcast_hub::HubError;
use roomcast_protocol::ProtocolError;
use roomcast_transport::TransportError;

use crate::auth::AuthError;

/// Top-level error that wraps all crate-specific errors.
///
/// Users of the `roomcast` crate deal with this single type; `#[from]`
/// on each variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomcastError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A hub-level error (room actor unavailable).
    #[error(transparent)]
    Hub(#[from] HubError),

    /// A handshake rejection.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let rc_err: RoomcastError = err.into();
        assert!(matches!(rc_err, RoomcastError::Transport(_)));
        assert!(rc_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_auth_error() {
        let err = AuthError::new("bad token");
        let rc_err: RoomcastError = err.into();
        assert!(matches!(rc_err, RoomcastError::Auth(_)));
        assert!(rc_err.to_string().contains("bad token"));
    }
}
