// ── DIAL wire-facing types ──
//
// Raw records as they come off the network, before the core turns them
// into domain sinks. `DialDevice` is what SSDP discovery yields;
// `DeviceDescription` and `AppInfo` are what the HTTP surface resolves.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A device announced by the discovery transport.
///
/// Identity is the SSDP USN, which is stable across responses from the same
/// receiver. The description URL comes from the LOCATION header and is only
/// valid until the device drops out of the announced set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialDevice {
    /// SSDP unique service name (e.g. `uuid:...::urn:dial-multiscreen-org:service:dial:1`).
    pub id: String,
    /// Where to fetch the device description (SSDP LOCATION header).
    pub description_url: Url,
    /// Source address the response arrived from.
    pub ip: IpAddr,
    /// When the transport last heard from this device.
    pub last_seen: DateTime<Utc>,
}

/// A resolved DIAL device description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Unique device name from the description body. Sink identity derives
    /// from this, not from the network address.
    pub udn: String,
    /// Human-readable receiver name.
    pub friendly_name: String,
    /// Receiver model, when reported.
    pub model_name: Option<String>,
    /// Application resource base (the `Application-URL` response header),
    /// normalized to end with `/` so app names join cleanly.
    pub app_url: Url,
}

/// Lifecycle state of a receiver application, per the DIAL app info resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AppState {
    Running,
    Stopped,
    /// Reported as `installable=<url>`; the app is not present yet.
    Installable,
    Hidden,
}

/// A resolved app info record for one (receiver, app name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub state: AppState,
}
