//! Bounded multi-producer, single-consumer channel for sampled events
//!
//! Producers never block: when the queue is full the event being published
//! is discarded (drop-newest) and counted. Events from one producer keep
//! their emission order; nothing is promised across producers.

use super::event::SampledEvent;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct ChannelStats {
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Constructor for the publisher/receiver pair
pub struct EventChannel;

impl EventChannel {
    pub fn bounded(capacity: usize) -> (EventPublisher, EventReceiver) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let stats = Arc::new(ChannelStats::default());

        (
            EventPublisher {
                tx,
                stats: Arc::clone(&stats),
            },
            EventReceiver {
                rx,
                stats,
                capacity,
            },
        )
    }
}

/// Producer handle. Clone one per instrumentation context.
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<SampledEvent>,
    stats: Arc<ChannelStats>,
}

impl EventPublisher {
    /// Try to enqueue `event`. Returns false if it was dropped.
    pub fn publish(&self, event: SampledEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn published(&self) -> u64 {
        self.stats.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer handle owned by the aggregator
pub struct EventReceiver {
    rx: Receiver<SampledEvent>,
    stats: Arc<ChannelStats>,
    capacity: usize,
}

impl EventReceiver {
    /// Wait up to `timeout` for an event, then take everything queued.
    ///
    /// Returns at most `capacity` events; empty on timeout or when every
    /// publisher is gone.
    pub fn poll(&self, timeout: Duration) -> Vec<SampledEvent> {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Vec::new(),
            Err(RecvTimeoutError::Disconnected) => {
                // Without publishers recv_timeout returns at once; keep the
                // poll cadence so callers do not spin.
                std::thread::sleep(timeout);
                return Vec::new();
            }
        };

        let mut events = Vec::with_capacity(self.rx.len() + 1);
        events.push(first);
        events.extend(self.rx.try_iter().take(self.capacity.saturating_sub(1)));
        events
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn published(&self) -> u64 {
        self.stats.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use std::thread;
    use std::time::Instant;

    fn event(node_id: u32, value: u64) -> SampledEvent {
        SampledEvent {
            node_id,
            event_type: EventType::Rtt,
            value,
            timestamp_ns: value,
            extra_data: 0,
        }
    }

    #[test]
    fn test_burst_beyond_capacity_drops_newest() {
        let (publisher, receiver) = EventChannel::bounded(8);

        let accepted = (0..20).filter(|&i| publisher.publish(event(0, i))).count();
        assert_eq!(accepted, 8);
        assert_eq!(publisher.dropped(), 12);

        let events = receiver.poll(Duration::from_millis(10));
        let values: Vec<u64> = events.iter().map(|e| e.value).collect();
        assert_eq!(values, (0..8).collect::<Vec<_>>());
        assert_eq!(receiver.published(), 8);
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_depth_tracks_queued_events() {
        let (publisher, receiver) = EventChannel::bounded(8);
        assert_eq!(receiver.capacity(), 8);
        assert!(receiver.is_empty());

        for value in 0..3 {
            publisher.publish(event(0, value));
        }
        assert_eq!(receiver.len(), 3);

        receiver.poll(Duration::from_millis(10));
        assert_eq!(receiver.len(), 0);
    }

    #[test]
    fn test_poll_times_out_empty() {
        let (_publisher, receiver) = EventChannel::bounded(4);
        let start = Instant::now();
        let events = receiver.poll(Duration::from_millis(20));
        assert!(events.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_poll_wakes_on_publish() {
        let (publisher, receiver) = EventChannel::bounded(4);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            publisher.publish(event(1, 42))
        });

        let events = receiver.poll(Duration::from_secs(5));
        assert!(producer.join().expect("producer panicked"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 42);
    }

    #[test]
    fn test_per_producer_order_is_preserved() {
        let (publisher, receiver) = EventChannel::bounded(4096);
        let producers: Vec<_> = (0..4u32)
            .map(|node| {
                let publisher = publisher.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        assert!(publisher.publish(event(node, i)));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer panicked");
        }

        let events = receiver.poll(Duration::from_millis(10));
        assert_eq!(events.len(), 2000);
        for node in 0..4u32 {
            let values: Vec<u64> = events
                .iter()
                .filter(|e| e.node_id == node)
                .map(|e| e.value)
                .collect();
            assert_eq!(values, (0..500).collect::<Vec<_>>());
        }
    }
}
