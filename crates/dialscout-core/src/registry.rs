// ── Round-scoped device registry ──
//
// Owns the current round's device membership and the sinks resolved from
// it. Replacement, not merging: a new round clears the current sink set and
// sinks repopulate as their descriptions resolve. Sinks from the previous
// round sit in `retired` until they either re-resolve (reinstated) or the
// round completes (dropped for good).

use std::collections::HashSet;

use dialscout_net::{DeviceDescription, DialDevice};
use indexmap::IndexMap;

use crate::model::{Sink, SinkId};

/// Outcome of applying a resolved description to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub sink: Sink,
    /// True when the sink is new this run or its data changed since it was
    /// last seen; drives "sink added" notification.
    pub changed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct DeviceRegistry {
    /// Device ids announced in the most recent round.
    round_devices: HashSet<String>,
    /// Sinks resolved during the current round, in discovery order.
    sinks: IndexMap<SinkId, Sink>,
    /// Sinks from the previous round awaiting re-resolution.
    retired: IndexMap<SinkId, Sink>,
}

impl DeviceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Begin a discovery round with the full device list for that round.
    ///
    /// Current sinks move to `retired`; resolution is asynchronous, so the
    /// current set repopulates as descriptions arrive. Safe to call again
    /// before the round completes (device events are drip-fed).
    pub(crate) fn replace_round(&mut self, devices: &[DialDevice]) {
        self.round_devices = devices.iter().map(|device| device.id.clone()).collect();
        let current = std::mem::take(&mut self.sinks);
        for (id, sink) in current {
            self.retired.insert(id, sink);
        }
    }

    /// Apply a resolved description. Returns `None` when the device is no
    /// longer part of the most recently announced round (a late resolution
    /// racing a device departure — expected under best-effort discovery).
    pub(crate) fn resolve(
        &mut self,
        device: &DialDevice,
        description: &DeviceDescription,
    ) -> Option<Resolved> {
        if !self.round_devices.contains(&device.id) {
            return None;
        }
        let sink = Sink::from_description(device, description);
        let reinstated = self.retired.shift_remove(&sink.id);
        let known = self.sinks.get(&sink.id).or(reinstated.as_ref());
        let changed = known != Some(&sink);
        self.sinks.insert(sink.id.clone(), sink.clone());
        Some(Resolved { sink, changed })
    }

    /// Finalize the round: anything still retired never re-resolved and is
    /// dropped. Returns the dropped ids so the caller can clear their
    /// availability entries.
    pub(crate) fn complete_round(&mut self) -> Vec<SinkId> {
        let dropped: Vec<SinkId> = self.retired.keys().cloned().collect();
        self.retired.clear();
        dropped
    }

    pub(crate) fn contains(&self, id: &SinkId) -> bool {
        self.sinks.contains_key(id)
    }

    /// Current sinks in discovery order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Sink> {
        self.sinks.values()
    }

    pub(crate) fn current_sinks(&self) -> Vec<Sink> {
        self.sinks.values().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use url::Url;

    fn device(n: u32) -> DialDevice {
        DialDevice {
            id: format!("uuid:dev-{n}::urn:dial-multiscreen-org:service:dial:1"),
            description_url: Url::parse(&format!("http://192.168.1.{n}:8008/dd.xml")).unwrap(),
            ip: format!("192.168.1.{n}").parse().unwrap(),
            last_seen: Utc::now(),
        }
    }

    fn description(n: u32) -> DeviceDescription {
        DeviceDescription {
            udn: format!("uuid:dev-{n}"),
            friendly_name: format!("TV {n}"),
            model_name: None,
            app_url: Url::parse(&format!("http://192.168.1.{n}:8008/apps/")).unwrap(),
        }
    }

    #[test]
    fn resolve_populates_current_sinks() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(1), device(2)]);

        let resolved = registry.resolve(&device(1), &description(1)).unwrap();
        assert!(resolved.changed);
        assert_eq!(registry.current_sinks().len(), 1);
        assert!(registry.contains(&resolved.sink.id));
    }

    #[test]
    fn stale_device_resolution_is_dropped() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(1)]);
        // Device 2 was never announced this round.
        assert!(registry.resolve(&device(2), &description(2)).is_none());
        assert!(registry.current_sinks().is_empty());
    }

    #[test]
    fn round_replacement_retires_then_drops_unresolved_sinks() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(1), device(2)]);
        registry.resolve(&device(1), &description(1)).unwrap();
        registry.resolve(&device(2), &description(2)).unwrap();
        assert!(registry.complete_round().is_empty());
        assert_eq!(registry.current_sinks().len(), 2);

        // Round 2 only announces device 1; device 2's sink never re-resolves.
        registry.replace_round(&[device(1)]);
        assert!(registry.current_sinks().is_empty());
        registry.resolve(&device(1), &description(1)).unwrap();

        let dropped = registry.complete_round();
        assert_eq!(dropped, vec![SinkId::from_udn("uuid:dev-2")]);
        let survivors = registry.current_sinks();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id, SinkId::from_udn("uuid:dev-1"));
    }

    #[test]
    fn reinstated_sink_with_same_data_is_not_changed() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(1)]);
        assert!(registry.resolve(&device(1), &description(1)).unwrap().changed);

        registry.replace_round(&[device(1)]);
        let resolved = registry.resolve(&device(1), &description(1)).unwrap();
        assert!(!resolved.changed);
    }

    #[test]
    fn changed_description_reports_changed() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(1)]);
        registry.resolve(&device(1), &description(1)).unwrap();

        let mut renamed = description(1);
        renamed.friendly_name = "Bedroom TV".into();
        let resolved = registry.resolve(&device(1), &renamed).unwrap();
        assert!(resolved.changed);
        assert_eq!(registry.current_sinks().len(), 1);
        assert_eq!(registry.current_sinks()[0].name, "Bedroom TV");
    }

    #[test]
    fn iteration_keeps_discovery_order() {
        let mut registry = DeviceRegistry::new();
        registry.replace_round(&[device(3), device(1), device(2)]);
        registry.resolve(&device(3), &description(3)).unwrap();
        registry.resolve(&device(1), &description(1)).unwrap();
        registry.resolve(&device(2), &description(2)).unwrap();

        let names: Vec<String> = registry.iter().map(|sink| sink.name.clone()).collect();
        assert_eq!(names, vec!["TV 3", "TV 1", "TV 2"]);
    }
}
