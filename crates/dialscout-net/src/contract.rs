// ── Collaborator contracts ──
//
// The discovery engine in `dialscout-core` depends on these traits, never on
// the concrete SSDP/HTTP types — test suites substitute scripted fakes.
// Completions are delivered over channels onto the engine's event loop, so
// implementations own their sockets and retry policy while the engine stays
// single-task.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::device::{AppInfo, DeviceDescription, DialDevice};
use crate::error::Error;

/// Events a discovery transport emits while running.
#[derive(Debug)]
pub enum TransportEvent {
    /// Full snapshot of the currently-reachable device set. Emitted whenever
    /// the set changes; consumers diff snapshots rather than tracking deltas.
    Devices(Vec<DialDevice>),
    /// A recoverable transport failure. Discovery is best-effort, so these
    /// are informational — the transport keeps running.
    Error(Error),
}

/// A device discovery transport.
///
/// `run` drives discovery until `cancel` fires: it emits device-list
/// snapshots on `events`, and each message on `probes` requests an immediate
/// search round (the caller owns the round cadence).
pub trait DiscoveryTransport: Clone + Send + Sync + 'static {
    fn run(
        &self,
        probes: mpsc::Receiver<()>,
        events: mpsc::Sender<TransportEvent>,
        cancel: CancellationToken,
    ) -> impl Future<Output = ()> + Send;
}

/// Resolves a discovered device into its DIAL device description.
pub trait DescriptionResolver: Clone + Send + Sync + 'static {
    fn resolve(
        &self,
        device: DialDevice,
    ) -> impl Future<Output = Result<DeviceDescription, Error>> + Send;
}

/// Fetches app info for one (app base URL, app name) pair.
pub trait AppInfoFetcher: Clone + Send + Sync + 'static {
    fn fetch_app_info(
        &self,
        app_url: url::Url,
        app_name: String,
    ) -> impl Future<Output = Result<AppInfo, Error>> + Send;
}
