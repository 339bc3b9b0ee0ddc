// ── Reactive sink streams ──
//
// Subscription types for consuming sink-list changes from the service.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Sink;

/// A subscription to the discovered sink list.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via `changed()` or by converting to a `Stream`. The list
/// updates at each round completion.
pub struct SinkStream {
    current: Vec<Sink>,
    receiver: watch::Receiver<Vec<Sink>>,
}

impl SinkStream {
    pub(crate) fn new(receiver: watch::Receiver<Vec<Sink>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time.
    pub fn current(&self) -> &[Sink] {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Vec<Sink> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the service has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<Sink>> {
        self.receiver.changed().await.ok()?;
        let snapshot = self.receiver.borrow_and_update().clone();
        self.current = snapshot.clone();
        Some(snapshot)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SinkWatchStream {
        SinkWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the sinks watch channel.
///
/// Yields a new snapshot each time the sink list is replaced.
pub struct SinkWatchStream {
    inner: WatchStream<Vec<Sink>>,
}

impl Stream for SinkWatchStream {
    type Item = Vec<Sink>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin when the item type is, and Vec<Sink> always is.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
