//! Bounded frame hand-off between fetch workers and the frame consumer.
//!
//! Never blocks a producer: when full, the oldest queued message is evicted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use tokio::sync::Notify;
use tracing::debug;

use crate::capture::FrameMessage;
use crate::error::QueueClosed;

/// Create a queue holding at most `capacity` messages.
pub fn bounded(capacity: usize) -> (FrameSender, FrameReceiver) {
    let shared = Arc::new(Shared {
        ring: Mutex::new(Ring {
            buf: HeapRb::new(capacity.max(1)),
            closed: false,
        }),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
        stats: CachePadded::new(Stats::default()),
    });
    (
        FrameSender {
            shared: shared.clone(),
        },
        FrameReceiver { shared },
    )
}

struct Shared {
    ring: Mutex<Ring>,
    notify: Notify,
    senders: AtomicUsize,
    stats: CachePadded<Stats>,
}

struct Ring {
    buf: HeapRb<FrameMessage>,
    closed: bool,
}

#[derive(Default)]
struct Stats {
    frames_written: AtomicUsize,
    frames_read: AtomicUsize,
    frames_dropped: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub written: usize,
    pub read: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    Empty,
    /// Closed and fully drained.
    Closed,
}

/// Producer handle. Cloneable; any clone may close the queue, and dropping
/// the last clone closes it.
pub struct FrameSender {
    shared: Arc<Shared>,
}

impl FrameSender {
    /// Enqueue `message`, returning the evicted oldest message if the queue
    /// was full.
    pub fn send(&self, message: FrameMessage) -> Result<Option<FrameMessage>, QueueClosed> {
        let evicted = {
            let mut ring = self.shared.ring.lock();
            if ring.closed {
                return Err(QueueClosed);
            }
            ring.buf.push_overwrite(message)
        };

        let stats = &self.shared.stats;
        stats.frames_written.fetch_add(1, Ordering::Relaxed);
        if let Some(old) = &evicted {
            stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("frames_dropped").increment(1);
            debug!("Queue full, dropped oldest frame for slot {}", old.slot());
        }

        self.shared.notify.notify_one();
        Ok(evicted)
    }

    /// No further sends succeed; queued messages remain receivable.
    pub fn close(&self) {
        self.shared.ring.lock().closed = true;
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.ring.lock().closed
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }
}

impl Clone for FrameSender {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for FrameSender {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("Last frame sender dropped, closing queue");
            self.close();
        }
    }
}

/// The single consumer handle. Dropping it closes the queue.
pub struct FrameReceiver {
    shared: Arc<Shared>,
}

impl FrameReceiver {
    pub fn try_recv(&mut self) -> Result<FrameMessage, TryRecvError> {
        let (popped, closed) = {
            let mut ring = self.shared.ring.lock();
            (ring.buf.try_pop(), ring.closed)
        };
        match popped {
            Some(message) => {
                self.shared
                    .stats
                    .frames_read
                    .fetch_add(1, Ordering::Relaxed);
                Ok(message)
            }
            None if closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Next message in arrival order, or `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<FrameMessage> {
        loop {
            match self.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Closed) => return None,
                Err(TryRecvError::Empty) => self.shared.notify.notified().await,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shared.ring.lock().buf.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.shared.ring.lock().closed = true;
    }
}

impl Shared {
    fn stats(&self) -> QueueStats {
        QueueStats {
            written: self.stats.frames_written.load(Ordering::Relaxed),
            read: self.stats.frames_read.load(Ordering::Relaxed),
            dropped: self.stats.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn msg(slot: usize, speed: &str) -> FrameMessage {
        FrameMessage::new(slot, None, speed.into(), String::new())
    }

    #[test]
    fn overflow_evicts_oldest() {
        let (tx, mut rx) = bounded(10);
        for i in 0..10 {
            assert_eq!(tx.send(msg(0, &i.to_string())).unwrap(), None);
        }
        let evicted = tx.send(msg(0, "10")).unwrap().unwrap();
        assert_eq!(evicted.speed(), "0");

        let drained: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.speed().to_owned())
            .collect();
        let expected: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
        assert_eq!(drained, expected);
        assert_eq!(
            rx.stats(),
            QueueStats {
                written: 11,
                read: 10,
                dropped: 1
            }
        );
    }

    #[test]
    fn closed_queue_rejects_sends_but_drains() {
        let (tx, mut rx) = bounded(4);
        tx.send(msg(1, "a")).unwrap();
        tx.send(msg(2, "b")).unwrap();
        tx.close();

        assert_eq!(tx.send(msg(3, "c")), Err(QueueClosed));
        assert_eq!(rx.try_recv().unwrap().slot(), 1);
        assert_eq!(rx.try_recv().unwrap().slot(), 2);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn empty_open_queue_reports_empty() {
        let (_tx, mut rx) = bounded(2);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert!(rx.is_empty());
    }

    #[test]
    fn dropping_receiver_closes_queue() {
        let (tx, rx) = bounded(2);
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(msg(0, "x")), Err(QueueClosed));
    }

    #[tokio::test]
    async fn dropping_last_sender_ends_the_stream() {
        let (tx, mut rx) = bounded(4);
        let spare = tx.clone();
        tx.send(msg(3, "kept")).unwrap();
        drop(tx);
        assert!(!spare.is_closed());

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(spare);
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.slot(), 3);
        let end = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn recv_wakes_on_send_from_other_task() {
        let (tx, mut rx) = bounded(2);
        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(msg(5, "late")).unwrap();
            tx.close();
        });

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.slot(), 5);
        assert!(rx.recv().await.is_none());
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn multiple_producers_share_one_queue() {
        let (tx, mut rx) = bounded(64);
        let handles: Vec<_> = (0..3)
            .map(|slot| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for i in 0..5 {
                        tx.send(msg(slot, &i.to_string())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        tx.close();

        let mut per_slot = [Vec::new(), Vec::new(), Vec::new()];
        while let Some(m) = rx.recv().await {
            per_slot[m.slot()].push(m.speed().to_owned());
        }
        for seen in per_slot {
            assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
        }
    }
}
