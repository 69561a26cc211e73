//! Hub configuration

use std::time::Duration;

/// Default time an empty room survives before it is reclaimed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Hub tuning options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a room must stay empty before it is removed
    pub grace_period: Duration,

    /// Depth of each client's outbound queue
    ///
    /// Frames for a client whose queue is full are dropped.
    pub client_queue_capacity: usize,

    /// Depth of each control loop request channel
    pub command_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            client_queue_capacity: 256,
            command_capacity: 1024,
        }
    }
}

impl HubConfig {
    /// Set the empty-room grace period
    pub fn grace_period(mut self, period: Duration) -> Self {
        self.grace_period = period;
        self
    }

    /// Set the per-client outbound queue depth (at least 1)
    pub fn client_queue_capacity(mut self, capacity: usize) -> Self {
        self.client_queue_capacity = capacity.max(1);
        self
    }

    /// Set the request channel depth (at least 1)
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }
}
