//! Reconciliation layer between the DIAL discovery transport
//! (`dialscout-net`) and application consumers.
//!
//! This crate owns the discovery business logic: which sinks currently
//! exist, which receiver apps are available where, and when consumers get
//! told about it:
//!
//! - **[`SinkService`]** — Central facade managing the full lifecycle:
//!   [`start()`](service::SinkService::start) spawns the transport task and
//!   the engine event loop, [`stop()`](service::SinkService::stop) tears
//!   both down. Monitoring and resync operations are routed to the event
//!   loop over a command channel.
//!
//! - **Reconciliation engine** ([`engine`]) — Applies device-list rounds,
//!   resolved descriptions, and app-info results to the registry and
//!   availability cache, emitting [`SinkEvent`]s only on observable change.
//!
//! - **[`DeviceRegistry`](registry)** / **availability cache**
//!   ([`availability`]) — Round-scoped sink storage and the per
//!   (sink, app) status map; sinks dropped at a round boundary lose their
//!   cached statuses so rediscovery always re-confirms.
//!
//! - **Discovery cycle** ([`cycle`]) — The settle-window debounce deciding
//!   when a drip-fed discovery round has stabilized enough to declare
//!   complete.
//!
//! - **[`SinkStream`]** — Subscription handle over the current-sinks watch
//!   channel with `current()` / `changed()` and a `Stream` adapter.
//!
//! All engine state is confined to one event-loop task; collaborators
//! (UDP discovery, HTTP fetches) run in their own tasks and deliver
//! completions over channels, so no engine method ever suspends or locks.

pub mod availability;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod service;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ServiceConfig;
pub use engine::SinkEvent;
pub use error::ServiceError;
pub use model::{AppStatus, Sink, SinkId};
pub use service::SinkService;
pub use stream::{SinkStream, SinkWatchStream};

// Collaborator contracts, re-exported so embedders constructing a
// `SinkService` don't need a direct `dialscout-net` dependency.
pub use dialscout_net::{AppInfoFetcher, DescriptionResolver, DiscoveryTransport};
