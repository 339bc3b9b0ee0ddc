// ── Per-(sink, app) availability cache ──
//
// Owns the last-known status map. Entries only exist for fetches performed
// while the sink was part of the current round: the engine clears a sink's
// entries whenever it drops at a round boundary, so a rediscovered sink is
// always re-confirmed rather than trusted from a previous identity.

use std::collections::HashMap;

use crate::model::{AppStatus, SinkId};

#[derive(Debug, Default)]
pub(crate) struct AvailabilityCache {
    statuses: HashMap<SinkId, HashMap<String, AppStatus>>,
}

impl AvailabilityCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Last-known status, `Unknown` if never fetched.
    pub(crate) fn get(&self, sink: &SinkId, app: &str) -> AppStatus {
        self.statuses
            .get(sink)
            .and_then(|apps| apps.get(app))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set(&mut self, sink: SinkId, app: &str, status: AppStatus) {
        self.statuses
            .entry(sink)
            .or_default()
            .insert(app.to_owned(), status);
    }

    /// Drop every entry for an app (monitoring stopped).
    pub(crate) fn clear_app(&mut self, app: &str) {
        for apps in self.statuses.values_mut() {
            apps.remove(app);
        }
        self.statuses.retain(|_, apps| !apps.is_empty());
    }

    /// Drop every entry for a sink (it vanished from the registry).
    pub(crate) fn clear_sink(&mut self, sink: &SinkId) {
        self.statuses.remove(sink);
    }
}
