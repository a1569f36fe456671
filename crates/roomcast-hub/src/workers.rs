//! The outbound worker pool.
//!
//! A fixed set of workers drains one bounded queue of (client, envelope)
//! jobs. The queue bound is the system's backpressure: when workers fall
//! behind, producers (plugins fanning out a broadcast) block on enqueue
//! instead of spawning unbounded delivery tasks.

use std::sync::Arc;

use roomcast_protocol::Envelope;
use tokio::sync::{Mutex, mpsc};

use crate::client::Client;

/// One unit of outbound work: deliver `envelope` to `client`.
pub struct WriteJob {
    pub client: Arc<Client>,
    pub envelope: Envelope,
}

/// Spawns `count` workers sharing the given job queue.
///
/// The workers exit when every job sender is dropped. A job for a client
/// that has since closed is dropped without affecting the jobs behind it.
pub(crate) fn spawn_workers(
    count: usize,
    receiver: mpsc::Receiver<WriteJob>,
) {
    let receiver = Arc::new(Mutex::new(receiver));

    for worker_id in 0..count {
        let receiver = Arc::clone(&receiver);
        tokio::spawn(async move {
            tracing::debug!(worker_id, "outbound worker started");

            loop {
                let job = receiver.lock().await.recv().await;
                let Some(job) = job else { break };

                if job.client.is_closed() {
                    tracing::trace!(
                        worker_id,
                        client_id = %job.client.id(),
                        "dropping job for closed client"
                    );
                    continue;
                }

                // This await is where a slow client slows the pool down:
                // its outbound buffer fills, the worker waits here, the
                // job queue fills, and producers block on enqueue. A
                // client closed mid-wait releases the worker.
                job.client.send(job.envelope).await;
            }

            tracing::debug!(worker_id, "outbound worker stopped");
        });
    }
}
