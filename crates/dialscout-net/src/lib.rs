// dialscout-net: DIAL discovery transport — SSDP probing and the DIAL HTTP surface.

pub mod contract;
pub mod device;
pub mod error;
pub mod http;
pub mod ssdp;

pub use contract::{AppInfoFetcher, DescriptionResolver, DiscoveryTransport, TransportEvent};
pub use device::{AppInfo, AppState, DeviceDescription, DialDevice};
pub use error::Error;
pub use http::{DialHttpClient, HttpConfig};
pub use ssdp::{DIAL_SEARCH_TARGET, SsdpConfig, SsdpTransport};
