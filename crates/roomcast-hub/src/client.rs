//! A connected party: one transport connection plus its resolved profile.
//!
//! The client owns its **write pump** — a task that drains the outbound
//! channel, encodes each envelope, and pushes it down the connection. The
//! matching read pump is owned by the room the client is admitted to (see
//! `room.rs`), because inbound traffic belongs to the room's event stream.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roomcast_protocol::{Codec, Envelope, JsonCodec, Profile};
use roomcast_transport::Connection;
use tokio::sync::{mpsc, watch};

/// Counter for generating unique client IDs.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Frames buffered per client before senders start waiting. Kept at one —
/// effectively a hand-off — so a stalled connection backs pressure up into
/// the worker pool instead of accumulating frames in memory.
const OUTBOUND_BUFFER: usize = 1;

/// Process-local identity of a client.
///
/// Membership and typing state key on this, never on profile data: two
/// clients with identical profiles (same user on two devices) are distinct
/// members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A member of a room: connection, profile, outbound channel, and a
/// completion signal that fires exactly once when the client closes.
pub struct Client {
    id: ClientId,
    profile: Profile,
    conn: Arc<dyn Connection>,
    outbound: mpsc::Sender<Envelope>,
    closed: watch::Sender<bool>,
}

impl Client {
    /// Creates a client and starts its write pump.
    pub fn spawn(
        profile: Profile,
        conn: Arc<dyn Connection>,
    ) -> Arc<Self> {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (closed_tx, closed_rx) = watch::channel(false);

        let client = Arc::new(Self {
            id: ClientId::next(),
            profile,
            conn,
            outbound: outbound_tx,
            closed: closed_tx,
        });

        tokio::spawn(write_pump(
            Arc::clone(&client),
            outbound_rx,
            closed_rx,
        ));

        client
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub(crate) fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    /// Hands an envelope to the write pump, waiting while the client's
    /// tiny outbound buffer is full — this is how a stalled connection
    /// slows its senders down. Resolves immediately once the client has
    /// closed (the write pump is gone); the message is then dropped.
    pub async fn send(&self, envelope: Envelope) {
        if self.outbound.send(envelope).await.is_err() {
            tracing::trace!(
                client_id = %self.id,
                "dropping outbound message for closed client"
            );
        }
    }

    /// Closes the connection and signals completion.
    ///
    /// Idempotent under concurrent callers: the transport is closed and
    /// `done()` is woken exactly once, on the first call.
    pub async fn close(&self) {
        let first = self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });

        if first {
            if let Err(e) = self.conn.close().await {
                tracing::debug!(
                    client_id = %self.id,
                    error = %e,
                    "error closing connection"
                );
            }
        }
    }

    /// Returns `true` once the client has been closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the client has closed. Usable by any number of
    /// waiters; the admission layer parks on this until disconnect.
    pub async fn done(&self) {
        let mut closed = self.closed.subscribe();
        // wait_for checks the current value first, so a client that closed
        // before this call resolves immediately.
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("username", &self.profile.username)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drains the outbound channel onto the connection.
///
/// A transport failure closes the connection and stops the pump; the leave
/// is reported by the read pump when its next read fails — never from
/// here, so a dying client produces exactly one leave event.
async fn write_pump(
    client: Arc<Client>,
    mut outbound: mpsc::Receiver<Envelope>,
    mut closed: watch::Receiver<bool>,
) {
    let codec = JsonCodec;

    loop {
        tokio::select! {
            changed = closed.changed() => {
                if changed.is_err() || *closed.borrow() {
                    break;
                }
            }
            maybe = outbound.recv() => {
                let Some(envelope) = maybe else { break };
                let data = match codec.encode(&envelope) {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::error!(
                            client_id = %client.id,
                            error = %e,
                            "failed to encode outbound envelope"
                        );
                        continue;
                    }
                };
                // The in-flight write races the close signal: closing a
                // client must unblock its pump even when the transport
                // has stalled mid-send.
                tokio::select! {
                    // Drop the non-Send watch::Ref inside the branch so the
                    // select future stays Send.
                    _ = async { let _ = closed.wait_for(|closed| *closed).await; } => break,
                    result = client.conn.send(&data) => {
                        if let Err(e) = result {
                            tracing::info!(
                                client_id = %client.id,
                                error = %e,
                                "write failed, closing connection"
                            );
                            client.close().await;
                            break;
                        }
                    }
                }
            }
        }
    }
}
