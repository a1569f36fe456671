//! The hub: creates rooms lazily, indexes them, and reaps them when idle.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use roomcast_protocol::RoomId;
use tokio::sync::{Mutex, mpsc};

use crate::client::Client;
use crate::config::HubConfig;
use crate::error::HubError;
use crate::registry::PluginRegistry;
use crate::room::{RoomHandle, spawn_room};
use crate::storage::Storage;
use crate::workers::{WriteJob, spawn_workers};

/// The room registry and the engine's entry point.
///
/// Rooms are created on first admit and evicted by a periodic sweep once
/// empty — deliberately not the instant the last member leaves, so short
/// reconnect gaps don't flap rooms. Two background loops (sweep, stats)
/// run for the hub's lifetime and stop when the hub is dropped; both are
/// operational, never correctness-critical.
pub struct Hub {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    registry: Arc<PluginRegistry>,
    storage: Arc<dyn Storage>,
    jobs: mpsc::Sender<WriteJob>,
    config: HubConfig,
}

impl Hub {
    /// Builds a hub, starting its worker pool and background loops.
    ///
    /// The registry must already be fully wired — registration is a
    /// startup-time operation, not safe once traffic flows.
    pub fn new(
        config: HubConfig,
        storage: Arc<dyn Storage>,
        registry: Arc<PluginRegistry>,
    ) -> Arc<Self> {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.job_queue_size);
        spawn_workers(config.workers, jobs_rx);

        let hub = Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            registry,
            storage,
            jobs: jobs_tx,
            config,
        });

        tokio::spawn(cleanup_loop(Arc::downgrade(&hub)));
        tokio::spawn(stats_loop(Arc::downgrade(&hub)));

        tracing::info!(
            workers = hub.config.workers,
            "hub started"
        );

        hub
    }

    /// Admits a client to the room with the given id, creating the room if
    /// this is the first join for an unseen identifier.
    ///
    /// Room creation is guarded by the hub lock, so concurrent first-joins
    /// for the same id resolve to a single room instance. A join that races
    /// the sweep (handle resolved, room evicted before the join lands) is
    /// retried against a fresh room rather than surfaced to the caller.
    /// The returned future resolves once the join is fully announced.
    pub async fn add_client(
        &self,
        room_id: RoomId,
        client: Arc<Client>,
    ) -> Result<(), HubError> {
        loop {
            let handle = {
                let mut rooms = self.rooms.lock().await;
                rooms
                    .entry(room_id)
                    .or_insert_with(|| {
                        spawn_room(
                            room_id,
                            Arc::clone(&self.registry),
                            Arc::clone(&self.storage),
                            self.jobs.clone(),
                            self.config.room_channel_size,
                        )
                    })
                    .clone()
            };

            match handle.join(Arc::clone(&client)).await {
                Ok(()) => return Ok(()),
                Err(HubError::RoomUnavailable(_)) => {
                    // The sweep got there first; the stale entry is already
                    // out of the index, so the next pass creates a fresh
                    // room.
                    tracing::debug!(
                        %room_id,
                        "room evicted mid-join, retrying"
                    );
                }
            }
        }
    }

    /// Returns the handle for an active room, if any.
    pub async fn room(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.rooms.lock().await.get(&room_id).cloned()
    }

    /// Number of currently active rooms (including empty, not-yet-swept
    /// ones).
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Evicts every room that is empty right now.
    async fn sweep(&self) {
        let mut rooms = self.rooms.lock().await;
        let empty: Vec<RoomId> = rooms
            .iter()
            .filter(|(_, handle)| handle.is_empty())
            .map(|(id, _)| *id)
            .collect();

        for room_id in empty {
            if let Some(handle) = rooms.remove(&room_id) {
                handle.shutdown().await;
                tracing::debug!(%room_id, "evicted empty room");
            }
        }
    }
}

/// Periodically evicts empty rooms. Holds only a weak reference so a
/// dropped hub tears its loops down with it.
///
/// The first sweep runs one full interval after startup, never
/// immediately — a room that empties right after the hub comes up still
/// gets its full reconnect grace period.
async fn cleanup_loop(hub: Weak<Hub>) {
    let Some(interval) = hub.upgrade().map(|h| h.config.cleanup_interval)
    else {
        return;
    };
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + interval,
        interval,
    );
    loop {
        ticker.tick().await;
        let Some(hub) = hub.upgrade() else { break };
        hub.sweep().await;
    }
}

/// Periodically logs occupancy.
async fn stats_loop(hub: Weak<Hub>) {
    let Some(interval) = hub.upgrade().map(|h| h.config.stats_interval)
    else {
        return;
    };
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + interval,
        interval,
    );
    loop {
        ticker.tick().await;
        let Some(hub) = hub.upgrade() else { break };
        let active_rooms = hub.room_count().await;
        tracing::info!(active_rooms, "hub stats");
    }
}
