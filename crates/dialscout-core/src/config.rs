// ── Runtime service configuration ──
//
// Tuning knobs for the discovery lifecycle. These never touch disk; the
// embedding application constructs a `ServiceConfig` and hands it in.

use std::time::Duration;

/// Configuration for a [`SinkService`](crate::service::SinkService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cadence of discovery probes. Must be non-zero. The first probe is
    /// sent immediately on start; each later tick asks the transport for a
    /// fresh search round.
    pub probe_interval: Duration,

    /// Quiet period after the last device/description activity before a
    /// discovery round is declared complete. Receivers answer a multicast
    /// probe over tens of milliseconds to seconds, so completion is
    /// activity-debounced rather than fixed-deadline.
    pub settle_window: Duration,

    /// Capacity of the subscriber event channel.
    pub event_capacity: usize,

    /// Capacity of the facade command channel.
    pub command_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(120),
            settle_window: Duration::from_secs(2),
            event_capacity: 256,
            command_capacity: 64,
        }
    }
}
