//! Operational knobs for the hub.
//!
//! Everything here is advisory tuning, not correctness-critical: a longer
//! sweep interval merely delays memory reclamation, a smaller worker count
//! merely throttles fan-out sooner.

use std::time::Duration;

/// Configuration for a [`Hub`](crate::Hub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Number of outbound delivery workers. Bounds concurrent fan-out
    /// independently of room size or room count.
    pub workers: usize,

    /// Capacity of the outbound job queue. When it fills, plugins block on
    /// enqueue — this is the system's backpressure mechanism.
    pub job_queue_size: usize,

    /// Capacity of each room actor's event channel.
    pub room_channel_size: usize,

    /// How often the hub sweeps for (and evicts) empty rooms. Eviction is
    /// deliberately deferred to the sweep so short reconnect gaps don't
    /// flap rooms in and out of existence.
    pub cleanup_interval: Duration,

    /// How often the hub logs its occupancy stats.
    pub stats_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            job_queue_size: 256,
            room_channel_size: 64,
            cleanup_interval: Duration::from_secs(30),
            stats_interval: Duration::from_secs(60),
        }
    }
}

/// Configuration for the typing-status plugin.
#[derive(Debug, Clone)]
pub struct TypingStatusConfig {
    /// How long a typing entry stays live without being refreshed.
    pub timeout: Duration,

    /// How often expired typing entries are swept out. Independent of room
    /// lifecycle — entries for reaped rooms age out here too.
    pub cleanup_interval: Duration,
}

impl Default for TypingStatusConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.workers, 8);
        assert!(config.job_queue_size > 0);
        assert!(config.cleanup_interval > Duration::ZERO);
    }

    #[test]
    fn test_typing_config_sweep_outlives_timeout() {
        let config = TypingStatusConfig::default();
        assert!(config.cleanup_interval >= config.timeout);
    }
}
