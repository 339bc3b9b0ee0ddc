// ── Domain model ──

mod app;
mod sink;

pub use app::AppStatus;
pub use sink::{Sink, SinkId};
