// ── SSDP discovery transport ──
//
// Sends M-SEARCH probes to the SSDP multicast group and folds unicast
// responses into a last-seen device map. Every response (after expiry
// pruning) re-emits the full device snapshot; the core's settle window
// absorbs the resulting burst.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::contract::{DiscoveryTransport, TransportEvent};
use crate::device::DialDevice;

/// DIAL search target for M-SEARCH probes.
pub const DIAL_SEARCH_TARGET: &str = "urn:dial-multiscreen-org:service:dial:1";

const SSDP_MULTICAST: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;

/// Tuning for the SSDP transport. Runtime only — never touches disk.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Devices not heard from for this long are dropped from snapshots.
    /// Should comfortably exceed the probe cadence so one missed response
    /// doesn't evict a healthy receiver.
    pub device_expiry: Duration,
    /// Receive buffer size. SSDP responses are a few hundred bytes.
    pub recv_buffer: usize,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            device_expiry: Duration::from_secs(300),
            recv_buffer: 4096,
        }
    }
}

/// M-SEARCH-based discovery for DIAL receivers.
#[derive(Debug, Clone, Default)]
pub struct SsdpTransport {
    config: SsdpConfig,
}

impl SsdpTransport {
    pub fn new(config: SsdpConfig) -> Self {
        Self { config }
    }
}

impl DiscoveryTransport for SsdpTransport {
    fn run(
        &self,
        mut probes: mpsc::Receiver<()>,
        events: mpsc::Sender<TransportEvent>,
        cancel: CancellationToken,
    ) -> impl Future<Output = ()> + Send {
        let config = self.config.clone();
        async move {
            let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(error = %e, "failed to bind SSDP socket");
                    let _ = events.send(TransportEvent::Error(e.into())).await;
                    return;
                }
            };
            let target = SocketAddr::from((SSDP_MULTICAST, SSDP_PORT));
            let request = msearch_request();
            let mut devices: HashMap<String, DialDevice> = HashMap::new();
            let mut buf = vec![0u8; config.recv_buffer.max(512)];

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    probe = probes.recv() => {
                        if probe.is_none() {
                            break;
                        }
                        debug!("sending M-SEARCH probe");
                        if let Err(e) = socket.send_to(request.as_bytes(), target).await {
                            warn!(error = %e, "M-SEARCH send failed");
                            let _ = events.send(TransportEvent::Error(e.into())).await;
                        }
                    }
                    received = socket.recv_from(&mut buf) => {
                        match received {
                            Ok((len, from)) => {
                                let raw = String::from_utf8_lossy(&buf[..len]);
                                let Some(device) =
                                    parse_search_response(&raw, from.ip(), Utc::now())
                                else {
                                    continue;
                                };
                                debug!(id = %device.id, ip = %device.ip, "SSDP response");
                                devices.insert(device.id.clone(), device);
                                prune_expired(&mut devices, config.device_expiry);
                                let snapshot: Vec<DialDevice> =
                                    devices.values().cloned().collect();
                                if events.send(TransportEvent::Devices(snapshot)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "SSDP receive failed"),
                        }
                    }
                }
            }
            debug!("SSDP transport stopped");
        }
    }
}

fn msearch_request() -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 2\r\n\
         ST: {DIAL_SEARCH_TARGET}\r\n\
         \r\n"
    )
}

fn prune_expired(devices: &mut HashMap<String, DialDevice>, expiry: Duration) {
    let Ok(expiry) = chrono::Duration::from_std(expiry) else {
        return;
    };
    let cutoff = Utc::now() - expiry;
    devices.retain(|_, device| device.last_seen > cutoff);
}

fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

/// Parse a unicast M-SEARCH response into a `DialDevice`.
///
/// Requires a 200 status line plus LOCATION and USN headers; when an ST
/// header is present it must name the DIAL service. Anything else is not a
/// DIAL receiver answering us and is ignored.
pub(crate) fn parse_search_response(
    raw: &str,
    from: IpAddr,
    now: DateTime<Utc>,
) -> Option<DialDevice> {
    let mut lines = raw.lines();
    let status = lines.next()?;
    if !status.starts_with("HTTP/") || !status.contains(" 200 ") {
        return None;
    }

    let mut location = None;
    let mut usn = None;
    let mut st = None;
    for line in lines {
        let Some((name, value)) = parse_header_line(line) else {
            continue;
        };
        match name.to_ascii_lowercase().as_str() {
            "location" => location = Some(value),
            "usn" => usn = Some(value),
            "st" => st = Some(value),
            _ => {}
        }
    }

    if st.is_some_and(|st| st != DIAL_SEARCH_TARGET) {
        return None;
    }
    let description_url = Url::parse(location?).ok()?;
    Some(DialDevice {
        id: usn?.to_owned(),
        description_url,
        ip: from,
        last_seen: now,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
        LOCATION: http://192.168.1.50:8008/ssdp/device-desc.xml\r\n\
        CACHE-CONTROL: max-age=1800\r\n\
        ST: urn:dial-multiscreen-org:service:dial:1\r\n\
        USN: uuid:device-1234::urn:dial-multiscreen-org:service:dial:1\r\n\
        \r\n";

    fn from_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))
    }

    #[test]
    fn parses_well_formed_response() {
        let device = parse_search_response(GOOD_RESPONSE, from_ip(), Utc::now()).unwrap();
        assert_eq!(
            device.id,
            "uuid:device-1234::urn:dial-multiscreen-org:service:dial:1"
        );
        assert_eq!(
            device.description_url.as_str(),
            "http://192.168.1.50:8008/ssdp/device-desc.xml"
        );
        assert_eq!(device.ip, from_ip());
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let raw = "HTTP/1.1 200 OK\r\n\
            Location: http://192.168.1.50:8008/dd.xml\r\n\
            Usn: uuid:abc\r\n\
            \r\n";
        let device = parse_search_response(raw, from_ip(), Utc::now()).unwrap();
        assert_eq!(device.id, "uuid:abc");
    }

    #[test]
    fn rejects_non_200_status() {
        let raw = GOOD_RESPONSE.replace(" 200 OK", " 503 Unavailable");
        assert!(parse_search_response(&raw, from_ip(), Utc::now()).is_none());
    }

    #[test]
    fn rejects_missing_location() {
        let raw = "HTTP/1.1 200 OK\r\nUSN: uuid:abc\r\n\r\n";
        assert!(parse_search_response(raw, from_ip(), Utc::now()).is_none());
    }

    #[test]
    fn rejects_missing_usn() {
        let raw = "HTTP/1.1 200 OK\r\nLOCATION: http://x/dd.xml\r\n\r\n";
        assert!(parse_search_response(raw, from_ip(), Utc::now()).is_none());
    }

    #[test]
    fn rejects_foreign_search_target() {
        let raw = GOOD_RESPONSE.replace(
            "urn:dial-multiscreen-org:service:dial:1\r\nUSN",
            "urn:schemas-upnp-org:device:MediaRenderer:1\r\nUSN",
        );
        assert!(parse_search_response(&raw, from_ip(), Utc::now()).is_none());
    }

    #[test]
    fn rejects_unparseable_location() {
        let raw = "HTTP/1.1 200 OK\r\nLOCATION: not a url\r\nUSN: uuid:abc\r\n\r\n";
        assert!(parse_search_response(raw, from_ip(), Utc::now()).is_none());
    }

    #[test]
    fn msearch_request_names_the_dial_service() {
        let request = msearch_request();
        assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(request.contains("ST: urn:dial-multiscreen-org:service:dial:1\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn prune_drops_devices_past_expiry() {
        let mut devices = HashMap::new();
        let stale = DialDevice {
            id: "uuid:stale".into(),
            description_url: Url::parse("http://192.168.1.9/dd.xml").unwrap(),
            ip: from_ip(),
            last_seen: Utc::now() - chrono::Duration::seconds(600),
        };
        let fresh = DialDevice {
            id: "uuid:fresh".into(),
            description_url: Url::parse("http://192.168.1.8/dd.xml").unwrap(),
            ip: from_ip(),
            last_seen: Utc::now(),
        };
        devices.insert(stale.id.clone(), stale);
        devices.insert(fresh.id.clone(), fresh);

        prune_expired(&mut devices, Duration::from_secs(300));
        assert_eq!(devices.len(), 1);
        assert!(devices.contains_key("uuid:fresh"));
    }
}
