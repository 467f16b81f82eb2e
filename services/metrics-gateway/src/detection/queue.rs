use std::time::{Duration, Instant};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::{TryRecvError, TrySendError}};
use tracing::trace;
use super::AnalyticsResult;
use crate::telemetry::METRICS;

/// Default number of undelivered results kept before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Lossy bounded hand-off between classification tasks and the anomaly listing.
///
/// Producers never wait: a full queue drops the newest result. Only `drain` removes
/// entries.
#[derive(Debug)]
pub struct AnomalyEventQueue {
    tx: mpsc::Sender<AnalyticsResult>,
    rx: Mutex<mpsc::Receiver<AnalyticsResult>>,
}

impl AnomalyEventQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx: Mutex::new(rx) }
    }

    /// Returns false and drops `result` when the queue is full.
    pub fn try_enqueue(&self, result: AnalyticsResult) -> bool {
        match self.tx.try_send(result) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                METRICS.events_dropped.with_label_values(&["queue_full"]).inc();
                trace!(device = %dropped.device_id, ts = dropped.timestamp, "event queue full, dropping result");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Removes every result queued when the drain starts, then keeps taking late
    /// arrivals until a read finds nothing ready or `max_wait` has elapsed.
    ///
    /// Never parks waiting for producers; results enqueued while a drain runs may land
    /// in this drain or the next one.
    pub fn drain(&self, max_wait: Duration) -> Vec<AnalyticsResult> {
        let deadline = Instant::now() + max_wait;
        let mut rx = self.rx.lock();
        let queued = self.len();
        let mut out = Vec::with_capacity(queued);
        loop {
            match rx.try_recv() {
                Ok(result) => out.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
            if out.len() >= queued && Instant::now() >= deadline { break; }
        }
        out
    }

    pub fn len(&self) -> usize { self.tx.max_capacity() - self.tx.capacity() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn capacity(&self) -> usize { self.tx.max_capacity() }
}
