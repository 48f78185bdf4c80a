//! Event-coalescing queue.
//!
//! A generic deduplicating queue that keeps at most one pending event per
//! tag (last write wins) and periodically drains everything pending to a
//! sink. The drain timer starts lazily on the first enqueue into an empty
//! queue and stops again once a drain leaves nothing pending, so an idle
//! queue costs no wake-ups.
//!
//! The pending map is owned exclusively by a single task loop driven by a
//! channel, so there is no lock: producers talk to the loop through a
//! [`QueueHandle`], and sink invocations happen after the pending map has
//! already been cleared.
//!
//! # Example
//!
//! ```ignore
//! let (queue, handle) = CoalescingQueue::new(QueueConfig::default(), sink);
//! tokio::spawn(queue.run(shutdown.clone()));
//!
//! handle.enqueue(SyncEvent::UpdateCourse(course));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default interval between drains.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// An event that can be coalesced by tag.
///
/// Two pending events with equal tags collapse to the most recently
/// enqueued one; payloads are never compared.
pub trait Coalesce: Send + 'static {
    /// The deduplication key.
    type Tag: Eq + Hash + Copy + Send + fmt::Debug + 'static;

    fn tag(&self) -> Self::Tag;
}

/// Receives drained events and pending-count changes.
///
/// `dispatch` is called once per distinct pending tag per drain, outside
/// the queue's bookkeeping, and must not block: spawn a task for anything
/// slow. Dispatches for different tags in the same drain carry no ordering
/// guarantee.
pub trait EventSink<E>: Send + Sync + 'static {
    /// Notified whenever the pending count changes. For observability
    /// (e.g. a network-activity indicator); default is a no-op.
    fn pending_changed(&self, _count: usize) {}

    /// Handles one drained event, fire-and-forget.
    fn dispatch(&self, event: E);
}

/// Queue configuration.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Interval between drains while anything is pending.
    pub drain_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            drain_interval: DEFAULT_DRAIN_INTERVAL,
        }
    }
}

/// Producer-side handle. Cheap to clone; safe to use from any task or
/// thread.
pub struct QueueHandle<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for QueueHandle<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> QueueHandle<E> {
    /// Submits an event for coalescing. Returns false if the queue loop
    /// has shut down.
    pub fn enqueue(&self, event: E) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// The queue's drain loop. Owns the pending map; runs until the
/// cancellation token fires.
pub struct CoalescingQueue<E, S>
where
    E: Coalesce,
    S: EventSink<E>,
{
    config: QueueConfig,
    rx: mpsc::UnboundedReceiver<E>,
    sink: Arc<S>,
}

impl<E, S> CoalescingQueue<E, S>
where
    E: Coalesce,
    S: EventSink<E>,
{
    /// Creates the queue and its producer handle.
    pub fn new(config: QueueConfig, sink: Arc<S>) -> (Self, QueueHandle<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { config, rx, sink }, QueueHandle { tx })
    }

    /// Runs the drain loop until shutdown is signalled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut pending: HashMap<E::Tag, E> = HashMap::new();
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(pending = pending.len(), "coalescing queue shutting down");
                    break;
                }

                Some(event) = self.rx.recv() => {
                    let tag = event.tag();
                    // Last write wins per tag.
                    if pending.insert(tag, event).is_some() {
                        debug!(?tag, "coalesced pending event");
                    }
                    self.sink.pending_changed(pending.len());

                    if ticker.is_none() {
                        // First drain one full interval after the queue
                        // stops being empty.
                        let start = time::Instant::now() + self.config.drain_interval;
                        let mut interval = time::interval_at(start, self.config.drain_interval);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        ticker = Some(interval);
                    }
                }

                _ = tick(&mut ticker) => {
                    let drained: Vec<E> = pending.drain().map(|(_, event)| event).collect();
                    self.sink.pending_changed(pending.len());

                    debug!(count = drained.len(), "draining coalesced events");
                    for event in drained {
                        self.sink.dispatch(event);
                    }

                    if pending.is_empty() {
                        ticker = None;
                    }
                }
            }
        }
    }
}

/// Waits for the next tick, or forever when no ticker is armed.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestTag {
        A,
        B,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TestEvent {
        tag: TestTag,
        value: u32,
    }

    impl Coalesce for TestEvent {
        type Tag = TestTag;

        fn tag(&self) -> TestTag {
            self.tag
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        dispatched: Mutex<Vec<TestEvent>>,
        counts: Mutex<Vec<usize>>,
    }

    impl EventSink<TestEvent> for RecordingSink {
        fn pending_changed(&self, count: usize) {
            self.counts.lock().push(count);
        }

        fn dispatch(&self, event: TestEvent) {
            self.dispatched.lock().push(event);
        }
    }

    fn start(
        interval: Duration,
    ) -> (
        Arc<RecordingSink>,
        QueueHandle<TestEvent>,
        CancellationToken,
    ) {
        let sink = Arc::new(RecordingSink::default());
        let config = QueueConfig {
            drain_interval: interval,
        };
        let (queue, handle) = CoalescingQueue::new(config, Arc::clone(&sink));
        let shutdown = CancellationToken::new();
        tokio::spawn(queue.run(shutdown.clone()));
        (sink, handle, shutdown)
    }

    #[tokio::test]
    async fn test_same_tag_coalesces_to_latest_payload() {
        let (sink, handle, shutdown) = start(Duration::from_millis(20));

        handle.enqueue(TestEvent { tag: TestTag::A, value: 1 });
        handle.enqueue(TestEvent { tag: TestTag::A, value: 2 });
        handle.enqueue(TestEvent { tag: TestTag::B, value: 3 });

        time::sleep(Duration::from_millis(50)).await;

        let mut dispatched = sink.dispatched.lock().clone();
        dispatched.sort_by_key(|e| e.value);
        assert_eq!(
            dispatched,
            vec![
                TestEvent { tag: TestTag::A, value: 2 },
                TestEvent { tag: TestTag::B, value: 3 },
            ]
        );

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_queue_idles_after_empty_drain() {
        let (sink, handle, shutdown) = start(Duration::from_millis(20));

        handle.enqueue(TestEvent { tag: TestTag::A, value: 1 });
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.dispatched.lock().len(), 1);

        // No further drains while nothing is enqueued.
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.dispatched.lock().len(), 1);

        // The next enqueue restarts the timer.
        handle.enqueue(TestEvent { tag: TestTag::A, value: 2 });
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.dispatched.lock().len(), 2);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_pending_count_callbacks() {
        let (sink, handle, shutdown) = start(Duration::from_millis(20));

        handle.enqueue(TestEvent { tag: TestTag::A, value: 1 });
        handle.enqueue(TestEvent { tag: TestTag::A, value: 2 });
        handle.enqueue(TestEvent { tag: TestTag::B, value: 3 });
        time::sleep(Duration::from_millis(50)).await;

        // Replacement keeps the count at 1; the drain resets it to 0.
        assert_eq!(*sink.counts.lock(), vec![1, 1, 2, 0]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_enqueue_from_other_tasks() {
        let (sink, handle, shutdown) = start(Duration::from_millis(20));

        let mut joins = Vec::new();
        for value in 0..4u32 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move {
                handle.enqueue(TestEvent { tag: TestTag::B, value });
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        time::sleep(Duration::from_millis(50)).await;

        // All four collapsed into one dispatch.
        assert_eq!(sink.dispatched.lock().len(), 1);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_enqueue_fails_after_shutdown() {
        let (_sink, handle, shutdown) = start(Duration::from_millis(20));

        shutdown.cancel();
        time::sleep(Duration::from_millis(10)).await;

        assert!(!handle.enqueue(TestEvent { tag: TestTag::A, value: 1 }));
    }
}
