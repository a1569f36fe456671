//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

fn to_io_error<E>(e: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::other(e)
}

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Signals a [`WebSocketTransport`] to stop accepting connections.
///
/// Cheap to clone, and stays usable after the transport has moved into
/// its accept loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Signals shutdown. Idempotent; a pending `accept` wakes with
    /// [`TransportError::Shutdown`].
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            listener,
            shutdown: Arc::new(shutdown),
        })
    }

    /// Returns a handle that can shut this transport down from another
    /// task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(
        &mut self,
    ) -> Result<Self::Connection, TransportError> {
        let mut shutdown = self.shutdown.subscribe();
        let (stream, addr) = tokio::select! {
            // wait_for checks the current value first, so an accept
            // issued after shutdown fails immediately.
            _ = shutdown.wait_for(|stop| *stop) => {
                return Err(TransportError::Shutdown);
            }
            accepted = self.listener.accept() => {
                accepted.map_err(TransportError::AcceptFailed)?
            }
        };

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::AcceptFailed(to_io_error(e)))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(
        &self,
    ) -> Result<std::net::SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let _ = self.shutdown.send(true);
        Ok(())
    }
}

/// A single WebSocket connection.
///
/// The underlying stream is split so the read half and write half each sit
/// behind their own lock: the hub's read pump can park on `recv` without
/// ever blocking a concurrent `send` from a write pump or worker.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

#[async_trait::async_trait]
impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        // JSON envelopes go out as text frames (what browser clients
        // expect); anything non-UTF-8 falls back to a binary frame.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(to_io_error(e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                // Control frames are not messages; keep reading.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Frame(_))) => {
                    // Raw frames only appear when reading fragments
                    // manually, which we never do.
                    continue;
                }
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        to_io_error(e),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::SendFailed(to_io_error(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
