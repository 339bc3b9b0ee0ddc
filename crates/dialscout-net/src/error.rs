use thiserror::Error;
use url::Url;

/// Top-level error type for the `dialscout-net` crate.
///
/// Covers every failure mode across both protocol surfaces: the SSDP/UDP
/// discovery transport and the DIAL HTTP surface (device descriptions and
/// app info). `dialscout-core` never surfaces these to its caller — it logs
/// them and converges availability state instead.
#[derive(Debug, Error)]
pub enum Error {
    // ── UDP / SSDP ──────────────────────────────────────────────────
    /// Socket bind, send, or receive failure.
    #[error("UDP socket error: {0}")]
    Socket(#[from] std::io::Error),

    // ── HTTP transport ──────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered, but not with a success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: Url },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── DIAL protocol ───────────────────────────────────────────────
    /// The device description response lacked the mandatory
    /// `Application-URL` header.
    #[error("Device description at {url} is missing the Application-URL header")]
    MissingAppUrl { url: Url },

    /// The device description body could not be interpreted.
    #[error("Malformed device description: {message}")]
    InvalidDescription { message: String },

    /// The app info body could not be interpreted.
    #[error("Malformed app info: {message}")]
    InvalidAppInfo { message: String },
}
