// ── Reconciliation engine ──
//
// Applies discovery rounds, resolved descriptions, and app-info results to
// the registry and availability cache, and emits events only when the
// observable state actually changed. Every method is synchronous: async
// work (description and app-info fetches) happens in collaborator tasks,
// and the engine only ever sees their terminal outcomes.

use std::collections::HashMap;
use std::sync::Arc;

use dialscout_net::{AppInfo, DeviceDescription, DialDevice, Error as NetError};
use indexmap::IndexSet;
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

use crate::availability::AvailabilityCache;
use crate::model::{AppStatus, Sink, SinkId};
use crate::registry::DeviceRegistry;

/// Notifications emitted to facade subscribers.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    /// A discovery round settled; carries the full current sink list.
    SinksDiscovered(Vec<Sink>),
    /// A sink resolved (new, or its data changed), or was re-broadcast on a
    /// user gesture.
    SinkAdded(Sink),
    /// An app's set of available sinks changed.
    AvailableSinksUpdated { app: String, sinks: Vec<Sink> },
}

/// An app-info fetch the engine wants performed. The event loop spawns it
/// and feeds the outcome back via [`Reconciler::on_app_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppFetch {
    pub sink_id: SinkId,
    pub app_url: Url,
    pub app_name: String,
}

pub(crate) struct Reconciler {
    registry: DeviceRegistry,
    cache: AvailabilityCache,
    /// Apps the caller is monitoring, in registration order.
    registered_apps: IndexSet<String>,
    /// Per app, the availability set as of the last notification. Compared
    /// by identity-set equality so reorderings are not "changes".
    observed: HashMap<String, IndexSet<SinkId>>,
    events: broadcast::Sender<SinkEvent>,
    sinks_tx: Arc<watch::Sender<Vec<Sink>>>,
}

impl Reconciler {
    pub(crate) fn new(
        events: broadcast::Sender<SinkEvent>,
        sinks_tx: Arc<watch::Sender<Vec<Sink>>>,
    ) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            cache: AvailabilityCache::new(),
            registered_apps: IndexSet::new(),
            observed: HashMap::new(),
            events,
            sinks_tx,
        }
    }

    /// A discovery round announced its device list.
    pub(crate) fn on_round_start(&mut self, devices: &[DialDevice]) {
        debug!(devices = devices.len(), "discovery round");
        self.registry.replace_round(devices);
    }

    /// A device description resolved. Returns the app-info fetches this
    /// makes necessary (registered apps without a confirmed `Available`).
    pub(crate) fn on_description_resolved(
        &mut self,
        device: &DialDevice,
        description: &DeviceDescription,
    ) -> Vec<AppFetch> {
        let Some(resolved) = self.registry.resolve(device, description) else {
            debug!(device = %device.id, "description resolved for stale device, dropping");
            return Vec::new();
        };
        if resolved.changed {
            let _ = self.events.send(SinkEvent::SinkAdded(resolved.sink.clone()));
        }
        self.fetches_for_sink(&resolved.sink, false)
    }

    /// A device description fetch failed. Best-effort: the device simply
    /// contributes no sink this round.
    pub(crate) fn on_description_error(&self, device: &DialDevice, error: &NetError) {
        debug!(device = %device.id, error = %error, "device description fetch failed");
    }

    /// Terminal outcome of an app-info fetch. Errors converge to
    /// `Unavailable` so a pair can never wedge in `Unknown`.
    pub(crate) fn on_app_info(
        &mut self,
        sink_id: &SinkId,
        app: &str,
        outcome: Result<AppInfo, NetError>,
    ) {
        if !self.registered_apps.contains(app) {
            debug!(app, "app info for unmonitored app, dropping");
            return;
        }
        if !self.registry.contains(sink_id) {
            // The sink left (or was dropped and not yet re-resolved); a
            // re-added sink must re-confirm from scratch.
            debug!(sink = %sink_id, app, "app info for departed sink, dropping");
            return;
        }
        let status = match outcome {
            Ok(info) => AppStatus::from(info.state),
            Err(error) => {
                debug!(sink = %sink_id, app, error = %error, "app info fetch failed");
                AppStatus::Unavailable
            }
        };
        self.cache.set(sink_id.clone(), app, status);
        self.notify_app_if_changed(app);
    }

    /// The settle window elapsed: the round is complete.
    pub(crate) fn on_round_complete(&mut self) {
        for sink_id in self.registry.complete_round() {
            debug!(sink = %sink_id, "sink dropped at round boundary");
            self.cache.clear_sink(&sink_id);
        }
        let sinks = self.registry.current_sinks();
        debug!(sinks = sinks.len(), "discovery round complete");
        self.sinks_tx.send_replace(sinks.clone());
        let _ = self.events.send(SinkEvent::SinksDiscovered(sinks));

        // A round that lost sinks must still notify shrunken (possibly
        // empty) availability sets.
        let apps: Vec<String> = self.registered_apps.iter().cloned().collect();
        for app in apps {
            self.notify_app_if_changed(&app);
        }
    }

    /// Begin monitoring an app. Returns probes for all current sinks that
    /// lack a confirmed `Available`.
    pub(crate) fn start_monitoring(&mut self, app: &str) -> Vec<AppFetch> {
        self.registered_apps.insert(app.to_owned());
        self.registry
            .iter()
            .filter(|sink| !self.cache.get(&sink.id, app).is_available())
            .map(|sink| AppFetch {
                sink_id: sink.id.clone(),
                app_url: sink.app_url.clone(),
                app_name: app.to_owned(),
            })
            .collect()
    }

    /// Stop monitoring an app: its registration, cached statuses, and
    /// observed set all go. A later re-registration starts from scratch.
    pub(crate) fn stop_monitoring(&mut self, app: &str) {
        self.registered_apps.shift_remove(app);
        self.cache.clear_app(app);
        self.observed.remove(app);
    }

    /// Explicit resync: re-broadcast every current sink and force-refetch
    /// every (sink, registered app) pair, cached status notwithstanding.
    pub(crate) fn on_user_gesture(&mut self) -> Vec<AppFetch> {
        debug!("user gesture resync");
        let mut fetches = Vec::new();
        for sink in self.registry.iter() {
            let _ = self.events.send(SinkEvent::SinkAdded(sink.clone()));
            fetches.extend(self.fetches_for_sink(sink, true));
        }
        fetches
    }

    pub(crate) fn available_sinks(&self, app: &str) -> Vec<Sink> {
        self.registry
            .iter()
            .filter(|sink| self.cache.get(&sink.id, app).is_available())
            .cloned()
            .collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn fetches_for_sink(&self, sink: &Sink, force: bool) -> Vec<AppFetch> {
        self.registered_apps
            .iter()
            .filter(|app| force || !self.cache.get(&sink.id, app).is_available())
            .map(|app| AppFetch {
                sink_id: sink.id.clone(),
                app_url: sink.app_url.clone(),
                app_name: app.clone(),
            })
            .collect()
    }

    /// Recompute an app's availability set and notify if it differs from
    /// the last-notified one. Emitted lists keep discovery order.
    fn notify_app_if_changed(&mut self, app: &str) {
        let available: IndexSet<SinkId> = self
            .registry
            .iter()
            .filter(|sink| self.cache.get(&sink.id, app).is_available())
            .map(|sink| sink.id.clone())
            .collect();

        let unchanged = self
            .observed
            .get(app)
            .map_or(available.is_empty(), |previous| *previous == available);
        if unchanged {
            return;
        }

        let sinks: Vec<Sink> = self
            .registry
            .iter()
            .filter(|sink| available.contains(&sink.id))
            .cloned()
            .collect();
        let _ = self.events.send(SinkEvent::AvailableSinksUpdated {
            app: app.to_owned(),
            sinks,
        });
        self.observed.insert(app.to_owned(), available);
    }
}
