// ── Core error types ──
//
// User-facing errors from dialscout-core. Discovery itself is best-effort
// and never surfaces transport failures to the caller — the only errors a
// consumer can see are lifecycle misuse and shutdown races.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A monitoring or resync operation was invoked before `start()`.
    ///
    /// This is a caller bug, surfaced loudly rather than silently ignored.
    #[error("discovery not running: {operation} requires start() first")]
    NotStarted { operation: &'static str },

    /// The engine event loop went away mid-operation (service stopping).
    #[error("discovery service is shutting down")]
    Shutdown,
}
