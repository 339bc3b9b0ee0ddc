// ── App availability types ──

use dialscout_net::AppState;
use serde::{Deserialize, Serialize};

/// Last-known availability of a receiver app on one sink.
///
/// `Unknown` is the default before any fetch completes for the current sink
/// generation; a pair is never reported available without a successful
/// fetch result while its sink was part of the current round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

impl AppStatus {
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl From<AppState> for AppStatus {
    /// A running or stopped app is present and launchable; anything else
    /// (installable, hidden) is not usable as a cast target.
    fn from(state: AppState) -> Self {
        match state {
            AppState::Running | AppState::Stopped => Self::Available,
            _ => Self::Unavailable,
        }
    }
}
