//! `RoomcastServer` builder and accept loop.
//!
//! This is the entry point for running a Roomcast chat server. It ties
//! together the layers: transport → handshake/auth → hub.

use std::sync::Arc;

use roomcast_hub::{Hub, HubConfig, Storage, TypingStatusConfig, standard_registry};
use roomcast_transport::{
    ShutdownHandle, Transport, TransportError, WebSocketTransport,
};

use crate::RoomcastError;
use crate::auth::Authenticator;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A: Authenticator> {
    pub(crate) hub: Arc<Hub>,
    pub(crate) auth: A,
}

/// Builder for configuring and starting a Roomcast server.
///
/// # Example
///
/// ```rust,ignore
/// use roomcast::prelude::*;
///
/// let server = RoomcastServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(my_auth, my_storage)
///     .await?;
/// server.run().await
/// ```
pub struct RoomcastServerBuilder {
    bind_addr: String,
    hub_config: HubConfig,
    typing_config: TypingStatusConfig,
}

impl RoomcastServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            hub_config: HubConfig::default(),
            typing_config: TypingStatusConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the hub configuration (worker count, queue sizes, sweep
    /// cadence).
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Sets the typing indicator configuration.
    pub fn typing_config(mut self, config: TypingStatusConfig) -> Self {
        self.typing_config = config;
        self
    }

    /// Builds the server: binds the listener and starts the hub with the
    /// standard plugin set (presence, typing status, user messages).
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
        storage: Arc<dyn Storage>,
    ) -> Result<RoomcastServer<A>, RoomcastError> {
        let transport =
            WebSocketTransport::bind(&self.bind_addr).await?;

        let registry = standard_registry(self.typing_config);
        let hub =
            Hub::new(self.hub_config, storage, Arc::new(registry));

        let state = Arc::new(ServerState { hub, auth });
        Ok(RoomcastServer { transport, state })
    }
}

impl Default for RoomcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Roomcast chat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RoomcastServer<A: Authenticator> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A>>,
}

impl<A: Authenticator> RoomcastServer<A> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(
        &self,
    ) -> Result<std::net::SocketAddr, RoomcastError> {
        Ok(self.transport.local_addr()?)
    }

    /// The hub behind this server. Exposed for inspection; admission
    /// still goes through the handshake.
    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.state.hub)
    }

    /// Returns a handle that stops the accept loop from another task.
    ///
    /// Grab one before calling [`run()`](Self::run), which consumes the
    /// server.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.transport.shutdown_handle()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each;
    /// a failed handshake ends only its own connection. Returns `Ok(())`
    /// once the transport is shut down. Connections admitted before
    /// shutdown keep running.
    pub async fn run(mut self) -> Result<(), RoomcastError> {
        tracing::info!("Roomcast server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(TransportError::Shutdown) => {
                    tracing::info!("Roomcast server shutting down");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
