//! Deferred, coalescing scroll-to-end scheduling.
//!
//! The source system deferred its scroll behind a timeout so the list could
//! finish rendering first. Here that becomes an observer capability: every
//! request bumps a request counter immediately (fire-and-forget, never
//! blocks the appender), and after the configured delay a generation counter
//! on a `watch` channel is bumped for whatever view is attached. A newer
//! request supersedes a pending one, so bursts of fragments collapse into a
//! single delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Debounced scroll-to-end requester.
///
/// Cloning shares the scheduler; all clones feed the same generation
/// counter. With a zero delay, delivery happens synchronously on request;
/// otherwise delivery is scheduled on the tokio runtime.
#[derive(Clone)]
pub struct ScrollScheduler {
    inner: Arc<ScrollInner>,
}

struct ScrollInner {
    delay: Duration,
    /// Issued requests, including superseded ones.
    requests: AtomicU64,
    /// Id of the newest request; stale timers check against this.
    latest: AtomicU64,
    /// Delivered scroll generations, observed by the view layer.
    generation: watch::Sender<u64>,
}

impl ScrollScheduler {
    pub fn new(delay: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(ScrollInner {
                delay,
                requests: AtomicU64::new(0),
                latest: AtomicU64::new(0),
                generation,
            }),
        }
    }

    /// A scheduler that delivers synchronously, with no deferral.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Request a scroll to the end of the list.
    ///
    /// Never blocks. With a nonzero delay the delivery fires only if no
    /// newer request arrives in the meantime; cancellation of superseded
    /// deliveries is an efficiency concern, not a correctness one.
    pub fn request(&self) {
        let id = self.inner.requests.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.latest.store(id, Ordering::Release);

        if self.inner.delay.is_zero() {
            self.inner.deliver();
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            if inner.latest.load(Ordering::Acquire) == id {
                inner.deliver();
            }
        });
    }

    /// How many scroll requests have been issued.
    pub fn request_count(&self) -> u64 {
        self.inner.requests.load(Ordering::Acquire)
    }

    /// How many scrolls have actually been delivered to observers.
    pub fn delivered(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Observe delivered scroll generations.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }
}

impl ScrollInner {
    fn deliver(&self) {
        // send_modify delivers even when no view is attached; a watch
        // channel keeps the latest value for late subscribers.
        self.generation.send_modify(|g| *g += 1);
    }
}

impl std::fmt::Debug for ScrollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollScheduler")
            .field("delay", &self.inner.delay)
            .field("requests", &self.request_count())
            .field("delivered", &self.delivered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_scheduler_delivers_synchronously() {
        let scroll = ScrollScheduler::immediate();
        scroll.request();
        scroll.request();
        assert_eq!(scroll.request_count(), 2);
        assert_eq!(scroll.delivered(), 2);
    }

    #[tokio::test]
    async fn deferred_requests_coalesce_into_one_delivery() {
        let scroll = ScrollScheduler::new(Duration::from_millis(20));
        scroll.request();
        scroll.request();
        scroll.request();
        assert_eq!(scroll.request_count(), 3);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(scroll.delivered(), 1);
    }

    #[tokio::test]
    async fn spaced_requests_each_deliver() {
        let scroll = ScrollScheduler::new(Duration::from_millis(10));
        scroll.request();
        tokio::time::sleep(Duration::from_millis(50)).await;
        scroll.request();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scroll.delivered(), 2);
    }

    #[tokio::test]
    async fn watch_subscriber_observes_generation() {
        let scroll = ScrollScheduler::immediate();
        let mut rx = scroll.subscribe();
        assert_eq!(*rx.borrow_and_update(), 0);

        scroll.request();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[test]
    fn request_without_observers_is_a_no_op_delivery() {
        let scroll = ScrollScheduler::immediate();
        scroll.request();
        assert_eq!(scroll.delivered(), 1);
    }
}
