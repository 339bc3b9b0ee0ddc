// ── Sink domain types ──
//
// A Sink is the domain view of a receiver: identity from the device
// description's UDN, current address and app-control URL from discovery.
// Identity is deliberately NOT derived from the network address — the same
// receiver on a new DHCP lease keeps its id.

use std::fmt;
use std::net::IpAddr;

use dialscout_net::{DeviceDescription, DialDevice};
use serde::{Deserialize, Serialize};
use url::Url;

/// Stable identifier for a discovered sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkId(String);

impl SinkId {
    /// Derive an id from a device UDN. The customary `uuid:` prefix is
    /// dropped so ids read the same whether or not a receiver includes it.
    pub fn from_udn(udn: &str) -> Self {
        let trimmed = udn.trim();
        let bare = trimmed.strip_prefix("uuid:").unwrap_or(trimmed);
        Self(format!("dial:{bare}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A discovered receiver capable of running DIAL apps.
///
/// Replaced wholesale each discovery round by the entries surviving that
/// round — never merged across rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sink {
    pub id: SinkId,
    /// Human-readable receiver name (description `friendlyName`).
    pub name: String,
    /// Address the receiver last answered from.
    pub ip: IpAddr,
    /// Base URL for app resources; app names join directly onto this.
    pub app_url: Url,
    /// Receiver model, when reported.
    pub model_name: Option<String>,
}

impl Sink {
    /// Build a sink from a discovered device and its resolved description.
    pub fn from_description(device: &DialDevice, description: &DeviceDescription) -> Self {
        Self {
            id: SinkId::from_udn(&description.udn),
            name: description.friendly_name.clone(),
            ip: device.ip,
            app_url: description.app_url.clone(),
            model_name: description.model_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn device(ip: &str) -> DialDevice {
        DialDevice {
            id: "uuid:1234::urn:dial-multiscreen-org:service:dial:1".into(),
            description_url: Url::parse("http://192.168.1.50:8008/dd.xml").unwrap(),
            ip: ip.parse().unwrap(),
            last_seen: Utc::now(),
        }
    }

    fn description() -> DeviceDescription {
        DeviceDescription {
            udn: "uuid:1234".into(),
            friendly_name: "Living Room TV".into(),
            model_name: Some("AcmeCast 4K".into()),
            app_url: Url::parse("http://192.168.1.50:8008/apps/").unwrap(),
        }
    }

    #[test]
    fn sink_id_strips_uuid_prefix() {
        assert_eq!(SinkId::from_udn("uuid:1234").as_str(), "dial:1234");
        assert_eq!(SinkId::from_udn("1234").as_str(), "dial:1234");
    }

    #[test]
    fn sink_id_is_stable_across_address_changes() {
        let first = Sink::from_description(&device("192.168.1.50"), &description());
        let second = Sink::from_description(&device("192.168.1.99"), &description());
        assert_eq!(first.id, second.id);
        assert_ne!(first.ip, second.ip);
    }

    #[test]
    fn sink_carries_description_fields() {
        let sink = Sink::from_description(&device("192.168.1.50"), &description());
        assert_eq!(sink.name, "Living Room TV");
        assert_eq!(sink.model_name.as_deref(), Some("AcmeCast 4K"));
        assert_eq!(sink.app_url.as_str(), "http://192.168.1.50:8008/apps/");
    }
}
