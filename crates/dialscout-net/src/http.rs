// ── DIAL HTTP client ──
//
// Wraps `reqwest::Client` with the two DIAL fetches: device descriptions
// (GET of the SSDP LOCATION, with the mandatory Application-URL response
// header) and app info (GET of {Application-URL}/{app name}). Both bodies
// are tiny flat XML documents; the handful of fields we need are extracted
// with a small tag scanner rather than an XML dependency.

use std::future::Future;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::contract::{AppInfoFetcher, DescriptionResolver};
use crate::device::{AppInfo, AppState, DeviceDescription, DialDevice};
use crate::error::Error;

/// Tuning for the DIAL HTTP client. Runtime only — never touches disk.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout. Receivers answer on the local segment, so this
    /// stays short; a slow receiver reads as unavailable, not as a stall.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client for DIAL device descriptions and app info resources.
#[derive(Debug, Clone)]
pub struct DialHttpClient {
    http: reqwest::Client,
}

impl DialHttpClient {
    /// Create a client from config.
    pub fn new(config: &HttpConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Use this when the embedding application already manages client
    /// construction, or in tests pointing at a mock server.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl DescriptionResolver for DialHttpClient {
    fn resolve(
        &self,
        device: DialDevice,
    ) -> impl Future<Output = Result<DeviceDescription, Error>> + Send {
        let http = self.http.clone();
        async move {
            debug!(url = %device.description_url, "fetching device description");
            let response = http.get(device.description_url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    status: status.as_u16(),
                    url: device.description_url,
                });
            }
            let app_url = response
                .headers()
                .get("Application-URL")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .ok_or_else(|| Error::MissingAppUrl {
                    url: device.description_url.clone(),
                })?;
            let body = response.text().await?;
            parse_device_description(&body, &app_url)
        }
    }
}

impl AppInfoFetcher for DialHttpClient {
    fn fetch_app_info(
        &self,
        app_url: Url,
        app_name: String,
    ) -> impl Future<Output = Result<AppInfo, Error>> + Send {
        let http = self.http.clone();
        async move {
            let url = app_url.join(&app_name)?;
            debug!(url = %url, app = %app_name, "fetching app info");
            let response = http.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    status: status.as_u16(),
                    url,
                });
            }
            let body = response.text().await?;
            parse_app_info(&body)
        }
    }
}

// ── Response parsing ─────────────────────────────────────────────────

pub(crate) fn parse_device_description(
    body: &str,
    app_url: &str,
) -> Result<DeviceDescription, Error> {
    let app_url = normalize_app_url(app_url)?;
    let udn = xml_text(body, "UDN").ok_or_else(|| Error::InvalidDescription {
        message: "missing <UDN>".into(),
    })?;
    if udn.is_empty() {
        return Err(Error::InvalidDescription {
            message: "empty <UDN>".into(),
        });
    }
    let friendly_name = xml_text(body, "friendlyName").ok_or_else(|| Error::InvalidDescription {
        message: "missing <friendlyName>".into(),
    })?;
    let model_name = xml_text(body, "modelName").filter(|name| !name.is_empty());
    Ok(DeviceDescription {
        udn,
        friendly_name,
        model_name,
        app_url,
    })
}

pub(crate) fn parse_app_info(body: &str) -> Result<AppInfo, Error> {
    let name = xml_text(body, "name").ok_or_else(|| Error::InvalidAppInfo {
        message: "missing <name>".into(),
    })?;
    let state_raw = xml_text(body, "state").ok_or_else(|| Error::InvalidAppInfo {
        message: "missing <state>".into(),
    })?;
    let state = parse_app_state(&state_raw)?;
    Ok(AppInfo { name, state })
}

fn parse_app_state(raw: &str) -> Result<AppState, Error> {
    let lower = raw.trim().to_ascii_lowercase();
    match lower.as_str() {
        "running" => Ok(AppState::Running),
        "stopped" => Ok(AppState::Stopped),
        "hidden" => Ok(AppState::Hidden),
        // Reported as `installable=<store url>`.
        s if s.starts_with("installable") => Ok(AppState::Installable),
        _ => Err(Error::InvalidAppInfo {
            message: format!("unrecognized state {raw:?}"),
        }),
    }
}

/// App resource URLs are formed by joining the app name onto the
/// Application-URL base; a trailing slash keeps `Url::join` from replacing
/// the final path segment.
fn normalize_app_url(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

/// Extract the trimmed text content of the first `<tag>` or `<tag attr...>`
/// element. Not a parser — DIAL bodies are flat and a few hundred bytes.
fn xml_text(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;
    while let Some(pos) = body[from..].find(&open) {
        let after_open = from + pos + open.len();
        let rest = &body[after_open..];
        let gt = rest.find('>')?;
        let attrs = &rest[..gt];
        // `<name>` or `<name attr="..">`, but not a longer tag like `<names>`.
        if attrs.is_empty() || attrs.starts_with(char::is_whitespace) {
            let content = &rest[gt + 1..];
            let end = content.find(&close)?;
            return Some(content[..end].trim().to_owned());
        }
        from = after_open;
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DESCRIPTION_BODY: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:dial-multiscreen-org:device:dial:1</deviceType>
    <friendlyName>Living Room TV</friendlyName>
    <manufacturer>Acme</manufacturer>
    <modelName>AcmeCast 4K</modelName>
    <UDN>uuid:1234-5678</UDN>
  </device>
</root>"#;

    #[test]
    fn parses_device_description() {
        let desc =
            parse_device_description(DESCRIPTION_BODY, "http://192.168.1.50:8008/apps").unwrap();
        assert_eq!(desc.udn, "uuid:1234-5678");
        assert_eq!(desc.friendly_name, "Living Room TV");
        assert_eq!(desc.model_name.as_deref(), Some("AcmeCast 4K"));
        assert_eq!(desc.app_url.as_str(), "http://192.168.1.50:8008/apps/");
    }

    #[test]
    fn app_url_trailing_slash_is_preserved() {
        let desc =
            parse_device_description(DESCRIPTION_BODY, "http://192.168.1.50:8008/apps/").unwrap();
        assert_eq!(desc.app_url.as_str(), "http://192.168.1.50:8008/apps/");
        assert_eq!(
            desc.app_url.join("YouTube").unwrap().as_str(),
            "http://192.168.1.50:8008/apps/YouTube"
        );
    }

    #[test]
    fn missing_udn_is_an_error() {
        let body = DESCRIPTION_BODY.replace("<UDN>uuid:1234-5678</UDN>", "");
        let err = parse_device_description(&body, "http://x/apps").unwrap_err();
        assert!(matches!(err, Error::InvalidDescription { .. }));
    }

    #[test]
    fn missing_friendly_name_is_an_error() {
        let body = DESCRIPTION_BODY.replace("<friendlyName>Living Room TV</friendlyName>", "");
        let err = parse_device_description(&body, "http://x/apps").unwrap_err();
        assert!(matches!(err, Error::InvalidDescription { .. }));
    }

    #[test]
    fn model_name_is_optional() {
        let body = DESCRIPTION_BODY.replace("<modelName>AcmeCast 4K</modelName>", "");
        let desc = parse_device_description(&body, "http://x/apps").unwrap();
        assert_eq!(desc.model_name, None);
    }

    #[test]
    fn parses_app_info_states() {
        for (raw, expected) in [
            ("running", AppState::Running),
            ("stopped", AppState::Stopped),
            ("hidden", AppState::Hidden),
            ("installable=http://store/app", AppState::Installable),
        ] {
            let body = format!(
                r#"<service xmlns="urn:dial-multiscreen-org:schemas:dial">
                     <name>YouTube</name>
                     <state>{raw}</state>
                   </service>"#
            );
            let info = parse_app_info(&body).unwrap();
            assert_eq!(info.name, "YouTube");
            assert_eq!(info.state, expected, "state {raw:?}");
        }
    }

    #[test]
    fn unknown_app_state_is_an_error() {
        let body = "<service><name>X</name><state>launching</state></service>";
        let err = parse_app_info(body).unwrap_err();
        assert!(matches!(err, Error::InvalidAppInfo { .. }));
    }

    #[test]
    fn missing_state_is_an_error() {
        let body = "<service><name>X</name></service>";
        assert!(matches!(
            parse_app_info(body).unwrap_err(),
            Error::InvalidAppInfo { .. }
        ));
    }

    #[test]
    fn xml_text_skips_longer_tag_names() {
        let body = "<names>wrong</names><name>right</name>";
        assert_eq!(xml_text(body, "name").as_deref(), Some("right"));
    }

    #[test]
    fn xml_text_handles_attributes() {
        let body = r#"<state xmlns="urn:x">running</state>"#;
        assert_eq!(xml_text(body, "state").as_deref(), Some("running"));
    }
}
